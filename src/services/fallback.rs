// src/services/fallback.rs

//! Text-fallback and derivation rules.
//!
//! Each field owns an ordered list of rules. A rule looks at the page and the
//! record built so far and may propose a value; the first proposal wins, and
//! a list only runs when the field is still unset after the table pass.

use regex::Regex;

use crate::error::Result;
use crate::parse::sanitize::label_alternation;
use crate::parse::{
    classify_up, try_parse_count, Sanitizer, SERVER_UP_KEYWORDS, STREAM_UP_KEYWORDS,
};
use crate::utils::stream_host;

use super::partial::{non_empty, PartialStatus};

/// Views of one upstream document.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// Document exactly as fetched
    pub raw_html: &'a str,
    /// Document with inline script blocks removed
    pub stripped_html: &'a str,
    /// Concatenated text nodes of the stripped document
    pub text: &'a str,
}

/// A single fallback rule for a field of type `T`.
pub type Rule<T> = fn(&FallbackRules, &Page<'_>, &PartialStatus) -> Option<T>;

const STREAM_TITLE: &[Rule<String>] = &[FallbackRules::stream_title_in_text];
const CURRENT_SONG: &[Rule<String>] = &[FallbackRules::current_song_in_text];
const AUDIO_STREAM_URL: &[Rule<String>] = &[FallbackRules::stream_link_in_html];
const BITRATE: &[Rule<String>] = &[FallbackRules::bitrate_in_text];
const CURRENT_LISTENERS: &[Rule<u64>] = &[
    FallbackRules::current_of_max_in_text,
    FallbackRules::listeners_in_text,
];
const MAX_LISTENERS: &[Rule<u64>] = &[FallbackRules::max_of_max_in_text];
const UNIQUE_LISTENERS: &[Rule<u64>] = &[FallbackRules::unique_in_text];
const LISTENER_PEAK: &[Rule<String>] = &[FallbackRules::peak_in_text];
const AVG_LISTEN_TIME: &[Rule<String>] = &[FallbackRules::avg_listen_time_in_text];
const STREAM_GENRE: &[Rule<String>] = &[
    FallbackRules::genre_in_html,
    FallbackRules::genre_in_text,
];
const SERVER_STATUS: &[Rule<String>] = &[FallbackRules::server_status_in_text];
const STREAM_STATUS: &[Rule<String>] = &[FallbackRules::stream_status_in_text];

// Derivations
const STREAM_URL: &[Rule<String>] = &[FallbackRules::host_of_audio_stream];
const CONTENT_TYPE: &[Rule<String>] = &[FallbackRules::mime_in_text];
const IS_SERVER_UP: &[Rule<bool>] = &[FallbackRules::server_up_from_status];
const IS_STREAM_UP: &[Rule<bool>] = &[FallbackRules::stream_up_from_status];

/// Compiled patterns backing the fallback rules.
#[derive(Debug, Clone)]
pub struct FallbackRules {
    stream_title: Regex,
    current_song: Regex,
    stream_link: Regex,
    bitrate: Regex,
    listeners_of_max: Regex,
    listeners: Regex,
    unique: Regex,
    peak: Regex,
    avg_listen_time: Regex,
    mime: Regex,
    genre_label: Regex,
    genre_stop: Regex,
    genre_line: Regex,
    server_status: Regex,
    stream_status: Regex,
    sanitizer: Sanitizer,
}

impl FallbackRules {
    pub fn new(sanitizer: Sanitizer) -> Result<Self> {
        Ok(Self {
            stream_title: Regex::new(
                r"(?i)(?:Stream Title|Station Name|Stream:)\s*[:\-]?\s*([^\n\r]+)",
            )?,
            current_song: Regex::new(r"(?i)(?:Current Song|Now Playing)\s*[:\-]?\s*([^\n\r]+)")?,
            stream_link: Regex::new(r#"(?i)(https?://[^\s"'<>]+/;?)"#)?,
            bitrate: Regex::new(r"(?i)(\d+)\s*kbps")?,
            listeners_of_max: Regex::new(r"(?i)(\d+)\s+of\s+(\d+)\s+listeners")?,
            listeners: Regex::new(r"(?i)(\d+)\s+listeners")?,
            unique: Regex::new(r"(?i)\((\d+)\s*unique\)")?,
            peak: Regex::new(r"(?i)(?:listener peak|peak listeners|peak)\s*[:\-]?\s*(\d+)")?,
            avg_listen_time: Regex::new(
                r"(?i)(?:average|avg) listen time\s*[:\-]?\s*([^\n\r]+)",
            )?,
            mime: Regex::new(r"(?i)audio/[a-z0-9.+\-]+")?,
            genre_label: Regex::new(r"(?i)(?:Stream Genre|Genre)\s*[:\-]?\s*")?,
            genre_stop: Regex::new(&format!("(?i){}", label_alternation()))?,
            genre_line: Regex::new(r"(?i)(?:Stream Genre|Genre)\s*[:\-]?\s*([^\n\r]*)")?,
            server_status: Regex::new(r"(?i)Server is currently (up|down)")?,
            stream_status: Regex::new(r"(?i)Stream (?:is|:)\s*[^\n\r]+")?,
            sanitizer,
        })
    }

    /// Fill every field the table pass left unset, then derive the rest.
    pub fn apply(&self, page: &Page<'_>, partial: &mut PartialStatus) {
        if partial.stream_title.is_none() {
            partial.stream_title = self.first_hit(STREAM_TITLE, page, partial);
        }
        if partial.current_song.is_none() {
            partial.current_song = self.first_hit(CURRENT_SONG, page, partial);
        }
        if partial.audio_stream_url.is_none() {
            partial.audio_stream_url = self.first_hit(AUDIO_STREAM_URL, page, partial);
        }
        if partial.bitrate_kbps.is_none() {
            partial.bitrate_kbps = self.first_hit(BITRATE, page, partial);
        }
        if partial.current_listeners.is_none() {
            partial.current_listeners = self.first_hit(CURRENT_LISTENERS, page, partial);
        }
        if partial.max_listeners.is_none() {
            partial.max_listeners = self.first_hit(MAX_LISTENERS, page, partial);
        }
        if partial.unique_listeners.is_none() {
            partial.unique_listeners = self.first_hit(UNIQUE_LISTENERS, page, partial);
        }
        if partial.listener_peak.is_none() {
            partial.listener_peak = self.first_hit(LISTENER_PEAK, page, partial);
        }
        if partial.avg_listen_time.is_none() {
            partial.avg_listen_time = self.first_hit(AVG_LISTEN_TIME, page, partial);
        }
        if partial.stream_genre.is_none() {
            partial.stream_genre = self.first_hit(STREAM_GENRE, page, partial);
        }
        if partial.server_status.is_none() {
            partial.server_status = self.first_hit(SERVER_STATUS, page, partial);
        }
        if partial.stream_status.is_none() {
            partial.stream_status = self.first_hit(STREAM_STATUS, page, partial);
        }

        if partial.stream_url.is_none() {
            partial.stream_url = self.first_hit(STREAM_URL, page, partial);
        }
        if partial.content_type.is_none() {
            partial.content_type = self.first_hit(CONTENT_TYPE, page, partial);
        }
        if partial.is_server_up.is_none() {
            partial.is_server_up = self.first_hit(IS_SERVER_UP, page, partial);
        }
        if partial.is_stream_up != Some(true) {
            partial.is_stream_up = self
                .first_hit(IS_STREAM_UP, page, partial)
                .or(partial.is_stream_up);
        }
    }

    fn first_hit<T>(&self, rules: &[Rule<T>], page: &Page<'_>, partial: &PartialStatus) -> Option<T> {
        rules.iter().find_map(|rule| rule(self, page, partial))
    }

    fn line_after(pattern: &Regex, haystack: &str) -> Option<String> {
        let caps = pattern.captures(haystack)?;
        non_empty(caps.get(1)?.as_str())
    }

    fn count_at(pattern: &Regex, haystack: &str, group: usize) -> Option<u64> {
        let caps = pattern.captures(haystack)?;
        try_parse_count(caps.get(group)?.as_str())
    }

    // --- Text rules ---

    fn stream_title_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Self::line_after(&self.stream_title, page.text)
    }

    fn current_song_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Self::line_after(&self.current_song, page.text)
    }

    /// The playable URL usually only appears as a link target.
    fn stream_link_in_html(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        let caps = self.stream_link.captures(page.raw_html)?;
        Some(caps.get(1)?.as_str().to_string())
    }

    fn bitrate_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Self::count_at(&self.bitrate, page.text, 1).map(|n| n.to_string())
    }

    fn current_of_max_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<u64> {
        Self::count_at(&self.listeners_of_max, page.text, 1)
    }

    fn max_of_max_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<u64> {
        Self::count_at(&self.listeners_of_max, page.text, 2)
    }

    fn listeners_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<u64> {
        Self::count_at(&self.listeners, page.text, 1)
    }

    fn unique_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<u64> {
        Self::count_at(&self.unique, page.text, 1)
    }

    fn peak_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Self::count_at(&self.peak, page.text, 1).map(|n| n.to_string())
    }

    fn avg_listen_time_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Self::line_after(&self.avg_listen_time, page.text)
    }

    /// Genre as found in the markup, up to the next known label.
    ///
    /// Once the label is present its capture is final, even when it cleans
    /// down to nothing.
    fn genre_in_html(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        let label = self.genre_label.find(page.stripped_html)?;
        Some(self.genre_up_to_stop(&page.stripped_html[label.end()..]))
    }

    fn genre_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        let caps = self.genre_line.captures(page.text)?;
        non_empty(&self.genre_up_to_stop(caps.get(1)?.as_str()))
    }

    fn genre_up_to_stop(&self, rest: &str) -> String {
        let end = self.genre_stop.find(rest).map_or(rest.len(), |stop| stop.start());
        self.sanitizer.sanitize(&rest[..end])
    }

    fn server_status_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        let caps = self.server_status.captures(page.text)?;
        Some(format!("Server is currently {}.", caps.get(1)?.as_str()))
    }

    fn stream_status_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        non_empty(self.stream_status.find(page.text)?.as_str())
    }

    // --- Derivations ---

    fn host_of_audio_stream(&self, _: &Page<'_>, partial: &PartialStatus) -> Option<String> {
        stream_host(partial.audio_stream_url.as_deref()?)
    }

    fn mime_in_text(&self, page: &Page<'_>, _: &PartialStatus) -> Option<String> {
        Some(self.mime.find(page.text)?.as_str().to_string())
    }

    fn server_up_from_status(&self, _: &Page<'_>, partial: &PartialStatus) -> Option<bool> {
        let status = partial.server_status.as_deref()?;
        Some(classify_up(status, SERVER_UP_KEYWORDS))
    }

    fn stream_up_from_status(&self, _: &Page<'_>, partial: &PartialStatus) -> Option<bool> {
        let status = partial.stream_status.as_deref()?;
        Some(classify_up(status, STREAM_UP_KEYWORDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> FallbackRules {
        FallbackRules::new(Sanitizer::new().unwrap()).unwrap()
    }

    fn page<'a>(html: &'a str, text: &'a str) -> Page<'a> {
        Page {
            raw_html: html,
            stripped_html: html,
            text,
        }
    }

    #[test]
    fn test_current_song_from_text() {
        let mut partial = PartialStatus::default();
        rules().apply(&page("", "Current Song: Artist - Title\n"), &mut partial);
        assert_eq!(partial.current_song.as_deref(), Some("Artist - Title"));
    }

    #[test]
    fn test_set_fields_are_not_overwritten() {
        let mut partial = PartialStatus {
            current_song: Some("From Table".into()),
            bitrate_kbps: Some("320".into()),
            ..PartialStatus::default()
        };
        rules().apply(
            &page("", "Current Song: From Text\nStream is up at 64 kbps"),
            &mut partial,
        );
        assert_eq!(partial.current_song.as_deref(), Some("From Table"));
        assert_eq!(partial.bitrate_kbps.as_deref(), Some("320"));
    }

    #[test]
    fn test_listener_rules_in_order() {
        let mut partial = PartialStatus::default();
        rules().apply(&page("", "12 of 500 listeners (4 unique)"), &mut partial);
        assert_eq!(partial.current_listeners, Some(12));
        assert_eq!(partial.max_listeners, Some(500));
        assert_eq!(partial.unique_listeners, Some(4));

        let mut partial = PartialStatus::default();
        rules().apply(&page("", "Now 9 listeners tuned in"), &mut partial);
        assert_eq!(partial.current_listeners, Some(9));
        assert_eq!(partial.max_listeners, None);
    }

    #[test]
    fn test_audio_url_and_host_derivation() {
        let html = r#"<a href="http://www.radio.example.com:8342/;">Listen</a>
                      <a href="http://other.example.com/">Other</a>"#;
        let mut partial = PartialStatus::default();
        rules().apply(&page(html, "Listen Other"), &mut partial);
        assert_eq!(
            partial.audio_stream_url.as_deref(),
            Some("http://www.radio.example.com:8342/;")
        );
        assert_eq!(partial.stream_url.as_deref(), Some("radio.example.com"));
    }

    #[test]
    fn test_genre_stops_at_next_label() {
        let html = "<p>Stream Genre: <b>Rock</b> 'Pop'</p><p>Stream URL: http://x.example/</p>";
        let mut partial = PartialStatus::default();
        rules().apply(&page(html, ""), &mut partial);
        assert_eq!(partial.stream_genre.as_deref(), Some("Rock Pop"));
    }

    #[test]
    fn test_empty_genre_does_not_borrow_following_rows() {
        let html = "<table><tr><td>Stream Genre:</td><td></td></tr>\
                    <tr><td>Stream URL:</td><td>http://radio.example.com</td></tr></table>";
        let mut partial = PartialStatus::default();
        rules().apply(
            &page(html, "Stream Genre:Stream URL:http://radio.example.com"),
            &mut partial,
        );
        assert_eq!(partial.stream_genre.as_deref(), Some(""));
    }

    #[test]
    fn test_genre_line_stops_at_next_label() {
        let genre = rules().genre_in_text(
            &page("", "Genre: Jazz Current Song: Artist - Title\n"),
            &PartialStatus::default(),
        );
        assert_eq!(genre.as_deref(), Some("Jazz"));
    }

    #[test]
    fn test_server_and_stream_status_from_text() {
        let mut partial = PartialStatus::default();
        rules().apply(
            &page("", "Server is currently UP and public.\nStream is up at 128 kbps\n"),
            &mut partial,
        );
        assert_eq!(partial.server_status.as_deref(), Some("Server is currently UP."));
        assert_eq!(partial.is_server_up, Some(true));
        assert_eq!(partial.stream_status.as_deref(), Some("Stream is up at 128 kbps"));
        assert_eq!(partial.is_stream_up, Some(true));
        assert_eq!(partial.bitrate_kbps.as_deref(), Some("128"));
    }

    #[test]
    fn test_content_type_and_peak() {
        let mut partial = PartialStatus::default();
        rules().apply(
            &page("", "Content: audio/mpeg\nListener Peak: 1024\nAvg Listen Time: 5m 12s\n"),
            &mut partial,
        );
        assert_eq!(partial.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(partial.listener_peak.as_deref(), Some("1024"));
        assert_eq!(partial.avg_listen_time.as_deref(), Some("5m 12s"));
    }

    #[test]
    fn test_empty_page_sets_nothing() {
        let mut partial = PartialStatus::default();
        rules().apply(&page("", ""), &mut partial);
        assert_eq!(partial, PartialStatus::default());
    }
}
