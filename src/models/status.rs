//! Published status record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized snapshot of the upstream streaming server.
///
/// Every field is always present when serialized: text defaults to `""`,
/// counts to `0` and flags to `false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Raw or derived server status phrase
    #[serde(default)]
    pub server_status: String,

    #[serde(default)]
    pub is_server_up: bool,

    /// Stream status sentence, e.g. "Stream is up at 128 kbps ..."
    #[serde(default)]
    pub stream_status: String,

    #[serde(default)]
    pub is_stream_up: bool,

    #[serde(default)]
    pub current_listeners: u64,

    #[serde(default)]
    pub max_listeners: u64,

    #[serde(default)]
    pub unique_listeners: u64,

    /// Bitrate as a decimal string, as the upstream formats it
    #[serde(default, alias = "bitrate")]
    pub bitrate_kbps: String,

    #[serde(default)]
    pub listener_peak: String,

    #[serde(default)]
    pub avg_listen_time: String,

    #[serde(default)]
    pub stream_title: String,

    #[serde(default)]
    pub stream_genre: String,

    #[serde(default)]
    pub content_type: String,

    /// Host of the stream, without a leading `www.`
    #[serde(default)]
    pub stream_url: String,

    /// Full playable stream URL
    #[serde(default)]
    pub audio_stream_url: String,

    #[serde(default)]
    pub current_song: String,

    /// Time of the extraction that produced this record
    pub last_updated: DateTime<Utc>,
}

impl StatusRecord {
    /// Zero-valued record stamped with the given time.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            server_status: String::new(),
            is_server_up: false,
            stream_status: String::new(),
            is_stream_up: false,
            current_listeners: 0,
            max_listeners: 0,
            unique_listeners: 0,
            bitrate_kbps: String::new(),
            listener_peak: String::new(),
            avg_listen_time: String::new(),
            stream_title: String::new(),
            stream_genre: String::new(),
            content_type: String::new(),
            stream_url: String::new(),
            audio_stream_url: String::new(),
            current_song: String::new(),
            last_updated: at,
        }
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::empty(Utc::now())
    }
}

/// Body of the liveness endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    pub ok: bool,
    pub last_updated: DateTime<Utc>,
}
