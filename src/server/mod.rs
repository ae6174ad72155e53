//! HTTP server setup and routing.

mod routes;

#[cfg(feature = "relay")]
mod relay;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, Method},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use crate::services::CacheCoordinator;

#[cfg(feature = "relay")]
pub use relay::{FORWARDED_HEADERS, Relay, relay_headers};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheCoordinator>,
    /// Audio relay; `None` when disabled in configuration
    #[cfg(feature = "relay")]
    pub relay: Option<Arc<Relay>>,
}

impl AppState {
    pub fn new(cache: Arc<CacheCoordinator>) -> Self {
        Self {
            cache,
            #[cfg(feature = "relay")]
            relay: None,
        }
    }

    #[cfg(feature = "relay")]
    pub fn with_relay(mut self, relay: Relay) -> Self {
        self.relay = Some(Arc::new(relay));
        self
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(routes::stream_info))
        .route("/api/stream-info", get(routes::stream_info))
        .route("/api/status", get(routes::liveness))
        .layer(cors_layer());

    // The relay sets its own cross-origin headers.
    #[cfg(feature = "relay")]
    let api = api.merge(
        Router::new()
            .route("/;", get(relay::player_page))
            .route("/stream/;", get(relay::stream_audio))
            .route("/stream", get(relay::stream_audio)),
    );

    api.with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .expose_headers([
            HeaderName::from_static("icy-metaint"),
            HeaderName::from_static("icy-name"),
        ])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{Liveness, StatusRecord};
    use crate::services::Extractor;
    use crate::services::StatusSource;

    const PAGE: &str = "<table>\
        <tr><td>Stream Status:</td><td>Stream is up at 128 kbps with 153 of 1000 listeners (1 unique)</td></tr>\
        <tr><td>Current Song:</td><td>Artist - Title</td></tr>\
        </table>";

    struct FixedSource {
        page: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusSource for FixedSource {
        async fn fetch_document(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.page {
                Some(page) => Ok(page.to_string()),
                None => Err(AppError::UpstreamUnreachable("connection refused".into())),
            }
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn app(page: Option<&'static str>) -> (Router, Arc<FixedSource>) {
        let source = Arc::new(FixedSource {
            page,
            calls: AtomicUsize::new(0),
        });
        let cache = CacheCoordinator::new(
            source.clone(),
            Extractor::new().unwrap(),
            Duration::from_secs(60),
        );
        (create_router(AppState::new(Arc::new(cache))), source)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_serves_record() {
        let (router, source) = app(Some(PAGE));
        let (status, body) = get_json(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        let record: StatusRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.current_listeners, 153);
        assert_eq!(record.bitrate_kbps, "128");
        assert_eq!(record.current_song, "Artist - Title");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_info_alias() {
        let (router, _) = app(Some(PAGE));
        let (status, body) = get_json(router, "/api/stream-info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isStreamUp"], true);
        assert_eq!(body["maxListeners"], 1000);
    }

    #[tokio::test]
    async fn test_upstream_failure_still_returns_ok() {
        let (router, _) = app(None);
        let (status, body) = get_json(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentSong"], "");
        assert_eq!(body["currentListeners"], 0);
        assert_eq!(body["isServerUp"], false);
    }

    #[tokio::test]
    async fn test_liveness_does_not_fetch() {
        let (router, source) = app(Some(PAGE));
        let (status, body) = get_json(router, "/api/status").await;

        assert_eq!(status, StatusCode::OK);
        let liveness: Liveness = serde_json::from_value(body).unwrap();
        assert!(liveness.ok);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cors_header_present() {
        let (router, _) = app(Some(PAGE));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .header("origin", "http://player.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[cfg(feature = "relay")]
    mod relay_routes {
        use axum::http::HeaderValue;
        use tokio::net::TcpListener;

        use super::*;
        use crate::models::RelayConfig;

        const AUDIO: &[u8] = b"ID3\x03\x00fake-mp3-frames";

        async fn spawn_audio_upstream() -> String {
            let upstream = Router::new()
                .route(
                    "/;",
                    get(|| async {
                        (
                            [
                                ("content-type", HeaderValue::from_static("audio/mpeg")),
                                ("icy-br", HeaderValue::from_static("128")),
                                ("x-internal", HeaderValue::from_static("secret")),
                            ],
                            AUDIO,
                        )
                    }),
                )
                .route("/gone", get(|| async { StatusCode::NOT_FOUND }));
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, upstream).await.unwrap();
            });
            format!("http://{addr}")
        }

        fn relay_app(url: String) -> Router {
            let source = Arc::new(FixedSource {
                page: Some(PAGE),
                calls: AtomicUsize::new(0),
            });
            let cache = CacheCoordinator::new(
                source,
                Extractor::new().unwrap(),
                Duration::from_secs(60),
            );
            let config = RelayConfig {
                url,
                ..RelayConfig::default()
            };
            let state = AppState::new(Arc::new(cache)).with_relay(Relay::new(&config).unwrap());
            create_router(state)
        }

        #[tokio::test]
        async fn test_relay_pipes_bytes_and_allowed_headers() {
            let base = spawn_audio_upstream().await;
            let response = relay_app(format!("{base}/;"))
                .oneshot(Request::builder().uri("/stream/;").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let headers = response.headers().clone();
            assert_eq!(headers["content-type"], "audio/mpeg");
            assert_eq!(headers["icy-br"], "128");
            assert_eq!(headers["access-control-allow-origin"], "*");
            assert!(headers.get("x-internal").is_none());

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(body.as_ref(), AUDIO);
        }

        #[tokio::test]
        async fn test_relay_propagates_upstream_error_status() {
            let base = spawn_audio_upstream().await;
            let response = relay_app(format!("{base}/gone"))
                .oneshot(Request::builder().uri("/stream/;").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_relay_disabled_is_not_found() {
            let (router, _) = app(Some(PAGE));
            let response = router
                .oneshot(Request::builder().uri("/stream/;").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn test_player_page() {
            let (router, _) = app(Some(PAGE));
            let response = router
                .oneshot(Request::builder().uri("/;").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert!(String::from_utf8_lossy(&body).contains(r#"src="/stream/;""#));
        }
    }
}
