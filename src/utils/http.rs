// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Create a client for long-lived streams.
///
/// Only connecting is bounded; the body may flow for as long as the listener
/// stays connected.
pub fn create_stream_client(user_agent: &str, connect_timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}
