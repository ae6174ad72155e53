// src/parse/labels.rs

//! Routing of status-table labels to record fields.

/// Record field a table label routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    ServerStatus,
    StreamStatus,
    CurrentListeners,
    MaxListeners,
    CurrentSong,
    StreamTitle,
    ContentType,
    StreamUrl,
    AudioStreamUrl,
    ListenerPeak,
    AvgListenTime,
    StreamGenre,
}

/// Label substrings per field, checked top to bottom; the first hit wins.
///
/// Order matters: "genre" is the loosest needle and must stay last.
pub const LABEL_ROUTES: &[(&[&str], LabelField)] = &[
    (&["server status"], LabelField::ServerStatus),
    (&["stream status"], LabelField::StreamStatus),
    (&["current listeners"], LabelField::CurrentListeners),
    (&["max listeners"], LabelField::MaxListeners),
    (&["current song", "now playing"], LabelField::CurrentSong),
    (&["stream title", "station name"], LabelField::StreamTitle),
    (&["content type"], LabelField::ContentType),
    (&["stream url", "streamurl"], LabelField::StreamUrl),
    (&["audio stream"], LabelField::AudioStreamUrl),
    (&["listener peak", "peak listeners"], LabelField::ListenerPeak),
    (
        &["average listen time", "avg listen time"],
        LabelField::AvgListenTime,
    ),
    (&["stream genre", "genre"], LabelField::StreamGenre),
];

/// Route a raw table label to a field.
///
/// The label is trimmed, a trailing colon dropped and the rest lower-cased.
pub fn route_label(label: &str) -> Option<LabelField> {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }
    LABEL_ROUTES.iter().find_map(|(needles, field)| {
        needles
            .iter()
            .any(|needle| normalized.contains(needle))
            .then_some(*field)
    })
}

/// Trim, drop a trailing colon and lower-case a label.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}
