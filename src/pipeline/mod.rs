//! Pipeline entry points.
//!
//! - `run_server`: Keep the status cache warm and serve the HTTP API
//! - `run_scrape`: Fetch and extract the upstream page once
//! - `run_parse`: Extract a status record from a local HTML file

pub mod scrape;
pub mod serve;

pub use scrape::{run_parse, run_scrape};
pub use serve::{build_state, run_server};
