//! Service layer for the status scraper.
//!
//! This module contains the business logic for:
//! - Status extraction (`Extractor`)
//! - Upstream fetching (`StatusSource`, `HttpStatusSource`)
//! - Cached refresh scheduling (`CacheCoordinator`)

mod cache;
mod extractor;
mod fallback;
mod partial;
mod source;

pub use cache::{CacheCoordinator, RefreshOutcome, spawn_refresh_loop};
pub use extractor::Extractor;
pub use fallback::{FallbackRules, Page, Rule};
pub use partial::PartialStatus;
pub use source::{HttpStatusSource, StatusSource, scrape};
