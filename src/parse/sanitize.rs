// src/parse/sanitize.rs

//! Cleanup for text recovered from the whole document rather than a table cell.

use regex::Regex;

use crate::error::Result;

/// Labels that bleed into free-text captures on SHOUTcast status pages.
pub const LEFTOVER_LABELS: &[&str] = &[
    "Stream URL:",
    "Stream ICQ:",
    "Stream AIM:",
    "Stream IRC:",
    "Current Song:",
    "Content Type:",
    "Server Status:",
    "Stream Status:",
];

/// Strips markup, label leftovers, script assignments and quotes.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    tags: Regex,
    labels: Regex,
    assignments: Regex,
    quotes: Regex,
    whitespace: Regex,
}

impl Sanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tags: Regex::new(r"<[^>]+>")?,
            labels: Regex::new(&format!("(?i){}", label_alternation()))?,
            assignments: Regex::new(r"var\s+[a-zA-Z0-9_]+\s*=\s*[^;]+;")?,
            quotes: Regex::new(r#"['"`]"#)?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Clean `raw` down to plain single-spaced text.
    ///
    /// Passes repeat until the text stops changing, so removing one fragment
    /// can never leave behind another that a second call would strip.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, raw: &str) -> String {
        let s = self.tags.replace_all(raw, " ");
        let s = self.labels.replace_all(&s, " ");
        let s = self.assignments.replace_all(&s, " ");
        let s = self.quotes.replace_all(&s, " ");
        self.whitespace.replace_all(&s, " ").trim().to_string()
    }
}

/// `(A|B|...)` over the escaped leftover labels.
pub(crate) fn label_alternation() -> String {
    let escaped: Vec<String> = LEFTOVER_LABELS.iter().map(|l| regex::escape(l)).collect();
    format!("(?:{})", escaped.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new().unwrap()
    }

    #[test]
    fn test_genre_with_script_and_quotes() {
        let s = sanitizer();
        assert_eq!(s.sanitize("Rock <script>var x=1;</script> 'Pop'"), "Rock Pop");
    }

    #[test]
    fn test_removes_labels_case_insensitively() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("</td><td>Jazz</td></tr><tr><td>stream url:"),
            "Jazz"
        );
        assert_eq!(s.sanitize("Blues Current Song: Something"), "Blues Something");
    }

    #[test]
    fn test_empty_input() {
        let s = sanitizer();
        assert_eq!(s.sanitize(""), "");
        assert_eq!(s.sanitize("   \n\t "), "");
    }

    #[test]
    fn test_idempotent() {
        let s = sanitizer();
        let inputs = [
            "Rock <script>var x=1;</script> 'Pop'",
            "var genre = \"Metal\"; Heavy `Metal`",
            "<<b>i>Nested</i>",
            "Stream Stream URL:URL: Ambient",
            "  \"Quoted\"   'and' `ticked`  ",
            "Plain text",
            "var a = 1; var b = 'two'; tail",
        ];
        for input in inputs {
            let once = s.sanitize(input);
            assert_eq!(s.sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}
