// src/services/extractor.rs

//! Status page extractor.
//!
//! Turns a fetched SHOUTcast status document into a [`StatusRecord`] in three
//! steps: strip inline scripts, read label/value rows from every table, then
//! let the fallback rules fill whatever the tables did not provide.

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::StatusRecord;
use crate::parse::{
    classify_up, route_label, try_parse_count, LabelField, Sanitizer, StreamStatusParser,
    SERVER_UP_KEYWORDS, STREAM_UP_KEYWORDS,
};

use super::fallback::{FallbackRules, Page};
use super::partial::{non_empty, PartialStatus};

/// Extracts normalized status records from upstream HTML.
#[derive(Debug, Clone)]
pub struct Extractor {
    script_blocks: Regex,
    rows: Selector,
    nested_table: Selector,
    stream_status: StreamStatusParser,
    sanitizer: Sanitizer,
    fallback: FallbackRules,
}

impl Extractor {
    /// Compile every pattern and selector used during extraction.
    pub fn new() -> Result<Self> {
        let sanitizer = Sanitizer::new()?;
        Ok(Self {
            script_blocks: Regex::new(r"(?is)<script.*?</script>")?,
            rows: Self::parse_selector("table tr")?,
            nested_table: Self::parse_selector("table")?,
            stream_status: StreamStatusParser::new()?,
            fallback: FallbackRules::new(sanitizer.clone())?,
            sanitizer,
        })
    }

    /// Extract a record stamped with the current time.
    pub fn extract(&self, html: &str) -> StatusRecord {
        self.extract_at(html, Utc::now())
    }

    /// Extract a record stamped with `at`.
    ///
    /// The same document and timestamp always give the same record.
    pub fn extract_at(&self, html: &str, at: DateTime<Utc>) -> StatusRecord {
        let stripped = self.strip_scripts(html);
        let document = Html::parse_document(&stripped);

        let mut partial = PartialStatus::default();
        self.table_pass(&document, &mut partial);

        let text: String = document.root_element().text().collect();
        let page = Page {
            raw_html: html,
            stripped_html: &stripped,
            text: &text,
        };
        self.fallback.apply(&page, &mut partial);

        partial.into_record(at)
    }

    fn strip_scripts(&self, html: &str) -> String {
        self.script_blocks.replace_all(html, " ").into_owned()
    }

    /// Read the first cell of each row as a label and the last as its value.
    ///
    /// Layout rows wrapping another table are skipped; the inner rows are
    /// visited on their own.
    fn table_pass(&self, document: &Html, partial: &mut PartialStatus) {
        for row in document.select(&self.rows) {
            let cells: Vec<ElementRef<'_>> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| cell.value().name() == "td")
                .collect();
            let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
                continue;
            };
            if self.wraps_table(first) || self.wraps_table(last) {
                continue;
            }

            let label: String = first.text().collect();
            let Some(field) = route_label(&label) else {
                continue;
            };
            let value: String = last.text().collect();
            self.apply_cell(field, value.trim(), partial);
        }
    }

    fn wraps_table(&self, cell: &ElementRef<'_>) -> bool {
        cell.select(&self.nested_table).next().is_some()
    }

    fn apply_cell(&self, field: LabelField, value: &str, partial: &mut PartialStatus) {
        match field {
            LabelField::ServerStatus => {
                if let Some(status) = non_empty(value) {
                    partial.is_server_up = Some(classify_up(&status, SERVER_UP_KEYWORDS));
                    partial.server_status = Some(status);
                }
            }
            LabelField::StreamStatus => {
                let Some(status) = non_empty(value) else {
                    return;
                };
                let parts = self.stream_status.parse(&status);
                partial.is_stream_up = Some(classify_up(&status, STREAM_UP_KEYWORDS));
                partial.stream_status = Some(status);
                if parts.bitrate_kbps.is_some() {
                    partial.bitrate_kbps = parts.bitrate_kbps;
                }
                if parts.current_listeners.is_some() {
                    partial.current_listeners = parts.current_listeners;
                }
                if parts.max_listeners.is_some() {
                    partial.max_listeners = parts.max_listeners;
                }
                if parts.unique_listeners.is_some() {
                    partial.unique_listeners = parts.unique_listeners;
                }
            }
            LabelField::CurrentListeners => {
                if let Some(count) = try_parse_count(value) {
                    partial.current_listeners = Some(count);
                }
            }
            LabelField::MaxListeners => {
                if let Some(count) = try_parse_count(value) {
                    partial.max_listeners = Some(count);
                }
            }
            LabelField::ListenerPeak => {
                if let Some(count) = try_parse_count(value) {
                    partial.listener_peak = Some(count.to_string());
                }
            }
            LabelField::StreamGenre => {
                if let Some(genre) = non_empty(&self.sanitizer.sanitize(value)) {
                    partial.stream_genre = Some(genre);
                }
            }
            LabelField::CurrentSong => set_text(&mut partial.current_song, value),
            LabelField::StreamTitle => set_text(&mut partial.stream_title, value),
            LabelField::ContentType => set_text(&mut partial.content_type, value),
            LabelField::StreamUrl => set_text(&mut partial.stream_url, value),
            LabelField::AudioStreamUrl => set_text(&mut partial.audio_stream_url, value),
            LabelField::AvgListenTime => set_text(&mut partial.avg_listen_time, value),
        }
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn set_text(slot: &mut Option<String>, value: &str) {
    if let Some(text) = non_empty(value) {
        *slot = Some(text);
    }
}
