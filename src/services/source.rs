// src/services/source.rs

//! Upstream status document sources.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{StatusRecord, UpstreamConfig};
use crate::utils::http::create_async_client;

use super::extractor::Extractor;

/// Something that can hand out the raw upstream status document.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the status document as HTML text.
    async fn fetch_document(&self) -> Result<String>;

    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;
}

/// Fetches the status page over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: Client,
    url: String,
}

impl HttpStatusSource {
    /// Create a source for the configured upstream URL.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = create_async_client(&config.user_agent, config.timeout())?;
        Ok(Self::with_client(client, &config.url))
    }

    /// Create a source reusing an existing client.
    pub fn with_client(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_document(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(AppError::from_fetch)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamBadStatus {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(AppError::from_fetch)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Fetch the upstream document and extract a record from it.
///
/// A failed fetch never produces a record.
pub async fn scrape(source: &dyn StatusSource, extractor: &Extractor) -> Result<StatusRecord> {
    let html = source.fetch_document().await?;
    Ok(extractor.extract(&html))
}
