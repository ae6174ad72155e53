//! Audio relay and player page.
//!
//! Pipes the upstream audio stream to browsers that cannot reach it directly,
//! forwarding only a handful of stream headers.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use futures::StreamExt;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::RelayConfig;
use crate::utils::http::create_stream_client;

use super::AppState;

/// Upstream headers copied onto the relayed response.
pub const FORWARDED_HEADERS: &[&str] = &[
    "content-type",
    "icy-metaint",
    "icy-br",
    "icy-name",
    "content-length",
];

const PLAYER_PAGE: &str = r#"<!doctype html>
<html><head><meta name="viewport" content="width=device-width"><meta charset="utf-8"><title>Player</title></head>
<body>
  <audio controls autoplay crossorigin="anonymous">
    <source src="/stream/;" type="audio/mpeg">
    Your browser does not support the audio element.
  </audio>
</body></html>"#;

/// Connection settings for the upstream audio stream.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    url: String,
    timeout: Duration,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = create_stream_client(&config.user_agent, config.timeout())?;
        Ok(Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout(),
        })
    }

    /// Request the upstream stream, bounded by the relay timeout until headers arrive.
    async fn open(&self) -> Result<reqwest::Response> {
        let request = self.client.get(&self.url).header("Icy-MetaData", "1").send();
        match tokio::time::timeout(self.timeout, request).await {
            Ok(response) => response.map_err(AppError::from_fetch),
            Err(_) => Err(AppError::UpstreamTimeout(format!(
                "no response from {} within {:?}",
                self.url, self.timeout
            ))),
        }
    }
}

/// Logs when a listener goes away; dropping it also drops the upstream body.
struct ListenerGuard {
    url: String,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        log::debug!("Listener disconnected, closing upstream {}", self.url);
    }
}

/// GET /; - minimal page playing the relayed stream.
pub async fn player_page() -> Html<&'static str> {
    Html(PLAYER_PAGE)
}

/// GET /stream/; - relay the upstream audio bytes.
pub async fn stream_audio(State(state): State<AppState>) -> Response {
    let Some(relay) = state.relay.as_deref() else {
        return (StatusCode::NOT_FOUND, "Relay disabled").into_response();
    };

    let upstream = match relay.open().await {
        Ok(upstream) => upstream,
        Err(e) => {
            log::error!("Stream relay failed to reach {}: {}", relay.url, e);
            return (StatusCode::BAD_GATEWAY, "Upstream unavailable").into_response();
        }
    };

    let status = upstream.status();
    if status.is_client_error() || status.is_server_error() {
        log::warn!("Stream relay upstream returned {status}");
        return (status, "Upstream error").into_response();
    }

    let headers = relay_headers(upstream.headers());
    let guard = ListenerGuard {
        url: relay.url.clone(),
    };
    let stream = upstream.bytes_stream().map(move |chunk| {
        let _listener = &guard;
        chunk.map_err(std::io::Error::other)
    });

    (headers, Body::from_stream(stream)).into_response()
}

/// Allow-listed upstream headers plus permissive cross-origin headers.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &name in FORWARDED_HEADERS {
        if let Some(value) = upstream.get(name) {
            headers.insert(HeaderName::from_static(name), value.clone());
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("icy-metaint,icy-name,Content-Length"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_headers_allow_list() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-type", HeaderValue::from_static("audio/mpeg"));
        upstream.insert("icy-br", HeaderValue::from_static("128"));
        upstream.insert("icy-name", HeaderValue::from_static("Radio Exemplo"));
        upstream.insert("set-cookie", HeaderValue::from_static("session=1"));
        upstream.insert("server", HeaderValue::from_static("SHOUTcast"));

        let headers = relay_headers(&upstream);

        assert_eq!(headers["content-type"], "audio/mpeg");
        assert_eq!(headers["icy-br"], "128");
        assert_eq!(headers["icy-name"], "Radio Exemplo");
        assert!(headers.get("set-cookie").is_none());
        assert!(headers.get("server").is_none());
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET,OPTIONS");
    }
}
