// src/pipeline/scrape.rs

//! One-shot extraction from the upstream page or a saved copy of it.

use std::path::Path;

use crate::error::Result;
use crate::models::{Config, StatusRecord};
use crate::services::{Extractor, HttpStatusSource, StatusSource, scrape};

/// Fetch the configured upstream page once, or `url` when given.
pub async fn run_scrape(config: &Config, url: Option<&str>) -> Result<StatusRecord> {
    let mut upstream = config.upstream.clone();
    if let Some(url) = url {
        upstream.url = url.to_string();
    }

    let source = HttpStatusSource::new(&upstream)?;
    let extractor = Extractor::new()?;

    log::info!("Fetching status page from {}", source.describe());
    let record = scrape(&source, &extractor).await?;
    log::info!(
        "Extracted status: {} of {} listeners, song {:?}",
        record.current_listeners,
        record.max_listeners,
        record.current_song
    );

    Ok(record)
}

/// Extract a status record from an HTML file on disk.
pub async fn run_parse(path: &Path) -> Result<StatusRecord> {
    let html = tokio::fs::read_to_string(path).await?;
    log::debug!("Read {} bytes from {}", html.len(), path.display());

    let extractor = Extractor::new()?;
    Ok(extractor.extract(&html))
}
