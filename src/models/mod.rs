// src/models/mod.rs

//! Domain models for the status scraper.

mod config;
mod status;

// Re-export all public types
pub use config::{Config, LoggingConfig, RelayConfig, ServerConfig, UpstreamConfig};
pub use status::{Liveness, StatusRecord};
