// src/pipeline/serve.rs

//! Long-running API server.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::error::Result;
use crate::models::Config;
use crate::server::{AppState, create_router};
use crate::services::{
    CacheCoordinator, Extractor, HttpStatusSource, RefreshOutcome, StatusSource,
    spawn_refresh_loop,
};

#[cfg(feature = "relay")]
use crate::server::Relay;

/// Build the shared handler state from configuration.
pub fn build_state(config: &Config) -> Result<AppState> {
    let source: Arc<dyn StatusSource> = Arc::new(HttpStatusSource::new(&config.upstream)?);
    let cache = CacheCoordinator::new(
        source,
        Extractor::new()?,
        config.upstream.cache_duration(),
    );
    let state = AppState::new(Arc::new(cache));

    #[cfg(feature = "relay")]
    let state = if config.relay.enabled {
        state.with_relay(Relay::new(&config.relay)?)
    } else {
        log::info!("Audio relay disabled");
        state
    };

    Ok(state)
}

/// Run the API server until a shutdown signal arrives.
pub async fn run_server(config: &Config) -> Result<()> {
    let state = build_state(config)?;

    log::info!("Initial fetch from {}", config.upstream.url);
    match state.cache.refresh().await {
        RefreshOutcome::Refreshed => log::info!("Initial status loaded"),
        _ => log::warn!("Initial fetch failed; serving empty status until the next refresh"),
    }

    let period = config.upstream.refresh_period();
    let refresher = spawn_refresh_loop(Arc::clone(&state.cache), period);
    log::info!("Keep-warm refresh every {:?}", period);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.abort();
    log::info!("Server stopped");

    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received Ctrl-C, shutting down"),
        () = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
