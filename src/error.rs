// src/error.rs

//! Unified error handling for the status scraper.

use std::fmt;

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or DNS failure while reaching the upstream server
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream did not answer within the fetch timeout
    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {status}")]
    UpstreamBadStatus { status: u16 },

    /// Upstream body could not be turned into a document
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed document error.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::MalformedDocument(message.to_string())
    }

    /// Classify a transport error raised while talking to the upstream server.
    pub fn from_fetch(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::UpstreamTimeout(error.to_string())
        } else if let Some(status) = error.status() {
            Self::UpstreamBadStatus {
                status: status.as_u16(),
            }
        } else if error.is_decode() || error.is_body() {
            Self::malformed(error)
        } else {
            Self::UpstreamUnreachable(error.to_string())
        }
    }

    /// Whether this error is an upstream failure the cache recovers from.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnreachable(_)
                | Self::UpstreamTimeout(_)
                | Self::UpstreamBadStatus { .. }
                | Self::MalformedDocument(_)
        )
    }
}
