//! Record under construction during extraction.

use chrono::{DateTime, Utc};

use crate::models::StatusRecord;

/// A status record whose fields may still be unset.
///
/// A text field counts as set once it holds a non-empty string; a count once
/// digits were actually parsed for it. The genre is the exception: a labelled
/// but empty genre is stored as `Some("")` so no later rule fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialStatus {
    pub server_status: Option<String>,
    pub is_server_up: Option<bool>,
    pub stream_status: Option<String>,
    pub is_stream_up: Option<bool>,
    pub current_listeners: Option<u64>,
    pub max_listeners: Option<u64>,
    pub unique_listeners: Option<u64>,
    pub bitrate_kbps: Option<String>,
    pub listener_peak: Option<String>,
    pub avg_listen_time: Option<String>,
    pub stream_title: Option<String>,
    pub stream_genre: Option<String>,
    pub content_type: Option<String>,
    pub stream_url: Option<String>,
    pub audio_stream_url: Option<String>,
    pub current_song: Option<String>,
}

impl PartialStatus {
    /// Fill every unset field with its zero value.
    pub fn into_record(self, at: DateTime<Utc>) -> StatusRecord {
        StatusRecord {
            server_status: self.server_status.unwrap_or_default(),
            is_server_up: self.is_server_up.unwrap_or(false),
            stream_status: self.stream_status.unwrap_or_default(),
            is_stream_up: self.is_stream_up.unwrap_or(false),
            current_listeners: self.current_listeners.unwrap_or(0),
            max_listeners: self.max_listeners.unwrap_or(0),
            unique_listeners: self.unique_listeners.unwrap_or(0),
            bitrate_kbps: self.bitrate_kbps.unwrap_or_default(),
            listener_peak: self.listener_peak.unwrap_or_default(),
            avg_listen_time: self.avg_listen_time.unwrap_or_default(),
            stream_title: self.stream_title.unwrap_or_default(),
            stream_genre: self.stream_genre.unwrap_or_default(),
            content_type: self.content_type.unwrap_or_default(),
            stream_url: self.stream_url.unwrap_or_default(),
            audio_stream_url: self.audio_stream_url.unwrap_or_default(),
            current_song: self.current_song.unwrap_or_default(),
            last_updated: at,
        }
    }
}

/// Trimmed text, or `None` when nothing is left.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
