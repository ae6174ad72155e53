// src/parse/fields.rs

//! Typed field parsers.
//!
//! Pure helpers that turn loosely formatted upstream text into counts,
//! bitrates and up/down flags. None of them fail: malformed input yields
//! the field's zero value.

use regex::Regex;

use crate::error::Result;

/// Keywords marking the server as up.
pub const SERVER_UP_KEYWORDS: &[&str] = &["up"];

/// Keywords marking the stream as up.
pub const STREAM_UP_KEYWORDS: &[&str] = &["stream", "up"];

/// Parse a listener-style count, returning 0 when no digits are present.
///
/// Dots are treated as thousand separators, so `"1.234 listeners"` is 1234.
pub fn parse_count(raw: &str) -> u64 {
    try_parse_count(raw).unwrap_or(0)
}

/// Parse the first digit run of `raw`, or `None` when it has no digits.
///
/// Runs too long for a `u64` saturate.
pub fn try_parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != '.').collect();
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let tail = &cleaned[start..];
    let end = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    Some(tail[..end].parse().unwrap_or(u64::MAX))
}

/// Case-insensitive test for any of `keywords` inside `raw`.
pub fn classify_up(raw: &str, keywords: &[&str]) -> bool {
    let lower = raw.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// Values recovered from a "Stream Status" sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStatusParts {
    pub bitrate_kbps: Option<String>,
    pub current_listeners: Option<u64>,
    pub max_listeners: Option<u64>,
    pub unique_listeners: Option<u64>,
}

/// Splits `"<adj> at <N> kbps with <N> of <N> listeners (<N> unique)"`.
///
/// Each part is matched on its own, so a sentence missing the bitrate still
/// yields listener counts and vice versa.
#[derive(Debug, Clone)]
pub struct StreamStatusParser {
    bitrate: Regex,
    listeners: Regex,
    unique: Regex,
}

impl StreamStatusParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bitrate: Regex::new(r"(?i)(\d+)\s*kbps")?,
            listeners: Regex::new(r"(?i)with\s+(\d+)\s+of\s+(\d+)")?,
            unique: Regex::new(r"(?i)\((\d+)\s*unique\)")?,
        })
    }

    pub fn parse(&self, sentence: &str) -> StreamStatusParts {
        let mut parts = StreamStatusParts::default();

        if let Some(caps) = self.bitrate.captures(sentence) {
            parts.bitrate_kbps = caps.get(1).map(|m| parse_count(m.as_str()).to_string());
        }
        if let Some(caps) = self.listeners.captures(sentence) {
            parts.current_listeners = caps.get(1).and_then(|m| try_parse_count(m.as_str()));
            parts.max_listeners = caps.get(2).and_then(|m| try_parse_count(m.as_str()));
        }
        if let Some(caps) = self.unique.captures(sentence) {
            parts.unique_listeners = caps.get(1).and_then(|m| try_parse_count(m.as_str()));
        }

        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("153"), 153);
        assert_eq!(parse_count("  42 listeners"), 42);
        assert_eq!(parse_count("1.234"), 1234);
        assert_eq!(parse_count("peak: 7 (at noon 12)"), 7);
    }

    #[test]
    fn test_parse_count_without_digits() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(try_parse_count("none"), None);
        assert_eq!(try_parse_count("0"), Some(0));
    }

    #[test]
    fn test_parse_count_saturates() {
        assert_eq!(parse_count("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_classify_up() {
        assert!(classify_up("Server is currently UP and public.", SERVER_UP_KEYWORDS));
        assert!(!classify_up("Server is currently down.", SERVER_UP_KEYWORDS));
        assert!(classify_up("Stream is up at 128 kbps", STREAM_UP_KEYWORDS));
        assert!(!classify_up("", STREAM_UP_KEYWORDS));
    }

    #[test]
    fn test_stream_status_full_sentence() {
        let parser = StreamStatusParser::new().unwrap();
        let parts = parser.parse("Stream is up at 128 kbps with 153 of 1000 listeners (1 unique)");

        assert_eq!(parts.bitrate_kbps.as_deref(), Some("128"));
        assert_eq!(parts.current_listeners, Some(153));
        assert_eq!(parts.max_listeners, Some(1000));
        assert_eq!(parts.unique_listeners, Some(1));
    }

    #[test]
    fn test_stream_status_parts_are_independent() {
        let parser = StreamStatusParser::new().unwrap();

        let parts = parser.parse("Stream is up with 5 of 50 listeners");
        assert_eq!(parts.bitrate_kbps, None);
        assert_eq!(parts.current_listeners, Some(5));
        assert_eq!(parts.max_listeners, Some(50));
        assert_eq!(parts.unique_listeners, None);

        let parts = parser.parse("Stream is up at 64kbps (3 unique)");
        assert_eq!(parts.bitrate_kbps.as_deref(), Some("64"));
        assert_eq!(parts.current_listeners, None);
        assert_eq!(parts.unique_listeners, Some(3));
    }
}
