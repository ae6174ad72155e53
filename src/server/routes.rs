//! Status API handlers.

use axum::{Json, extract::State};

use crate::models::{Liveness, StatusRecord};

use super::AppState;

/// GET / and GET /api/stream-info - the current status record.
///
/// Upstream failures never reach the client; the best known record is served.
pub async fn stream_info(State(state): State<AppState>) -> Json<StatusRecord> {
    let record = state.cache.read().await;
    Json(record.as_ref().clone())
}

/// GET /api/status - liveness, without touching the upstream.
pub async fn liveness(State(state): State<AppState>) -> Json<Liveness> {
    let record = state.cache.snapshot().await;
    Json(Liveness {
        ok: true,
        last_updated: record.last_updated,
    })
}
