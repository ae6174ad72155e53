//! Field parsing, label routing and text sanitizing.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod fields;
pub mod labels;
pub mod sanitize;

pub use fields::{
    classify_up, parse_count, try_parse_count, StreamStatusParser, StreamStatusParts,
    SERVER_UP_KEYWORDS, STREAM_UP_KEYWORDS,
};
pub use labels::{route_label, LabelField};
pub use sanitize::Sanitizer;
