//! Title and text normalisation.
//!
//! Headings printed in a table of contents and the same headings in extracted text rarely agree
//! byte for byte: numbering gets renumbered or dropped, punctuation and case drift, OCR inserts
//! stray symbols. This module reduces both sides to lowercase alphanumeric words separated by
//! single spaces, while remembering where every normalised byte came from so that matches can be
//! mapped back to offsets in the raw text.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?i:chapter|part|section|appendix)\s+(?:\d+(?:\.\d+)*|[IVXLCDM]+|[A-Z])\b|\d+(?:\.\d+)*|[A-Z](?:\.\d+)+)\.?(?:\s*[:.)\-–—]\s*|\s+)",
    )
    .expect("numbering pattern is valid")
});

static DOTTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*|[A-Z](?:\.\d+)+)\.?(?:\s|$)").expect("dotted pattern is valid")
});

static LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?i:chapter|part|section|appendix))\s+(\d+(?:\.\d+)*|[IVXLCDM]+|[A-Z])\b")
        .expect("labelled pattern is valid")
});

#[must_use]
/// Trims a title and collapses internal runs of whitespace to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
/// Byte length of a leading numbering prefix such as `7.1 `, `A.2 ` or `Part 2 — `.
///
/// Returns 0 when there is no prefix or when stripping it would leave nothing to match on.
pub fn numbering_prefix_len(text: &str) -> usize {
    match NUMBERING.find(text) {
        Some(prefix) if text[prefix.end()..].chars().any(char::is_alphanumeric) => prefix.end(),
        _ => 0,
    }
}

#[must_use]
/// Byte length of leading whitespace and Markdown `#` marks on a line.
pub fn heading_marks_len(line: &str) -> usize {
    line.len()
        - line
            .trim_start_matches(|c: char| c.is_whitespace() || c == '#')
            .len()
}

#[must_use]
/// The title without its numbering prefix, e.g. `7.1 Data validation` becomes `Data validation`.
pub fn strip_numbering(title: &str) -> &str {
    title[numbering_prefix_len(title)..].trim()
}

#[must_use]
/// Normalised form of a single title, comparable with [`NormalizedText::as_str`] content.
pub fn normalize_title(title: &str, strip_numbering: bool) -> String {
    NormalizedText::new(title, strip_numbering).text
}

#[must_use]
/// Title for an introduction node inserted beneath `parent_title`.
///
/// Dotted numbering gains a `.0` component (`7` becomes `7.0 Introduction`, `A.1` becomes
/// `A.1.0 Introduction`). Labelled numbering keeps its label (`Part 2 — Scalability` becomes
/// `Part 2 Introduction`). Anything else is suffixed as a whole.
pub fn introduction_title(parent_title: &str) -> String {
    let title = parent_title.trim();
    if let Some(caps) = DOTTED.captures(title) {
        return format!("{}.0 Introduction", &caps[1]);
    }
    if let Some(caps) = LABELLED.captures(title) {
        return format!("{} {} Introduction", &caps[1], &caps[2]);
    }
    format!("{title} Introduction")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Normalised copy of a text with a byte map back to the original.
///
/// For each byte of the normalised text, `orig_start` and `orig_end` give the half-open span of
/// the original text it was produced from. Separator spaces map to the whole run of whitespace
/// and punctuation they replaced. Line structure is preserved: every original line produces one
/// normalised line, so a normalised match can be checked for starting a line.
pub struct NormalizedText {
    text: String,
    orig_start: Vec<usize>,
    orig_end: Vec<usize>,
}

impl NormalizedText {
    #[must_use]
    /// Normalises `source`, optionally stripping a numbering prefix from every line.
    pub fn new(source: &str, strip_numbering: bool) -> Self {
        let mut normalized = Self {
            text: String::with_capacity(source.len()),
            orig_start: Vec::with_capacity(source.len()),
            orig_end: Vec::with_capacity(source.len()),
        };
        let mut line_start = 0;
        for line in source.split_inclusive('\n') {
            let body = line.strip_suffix('\n').unwrap_or(line);
            let skip = if strip_numbering {
                let lead = heading_marks_len(body);
                lead + numbering_prefix_len(&body[lead..])
            } else {
                0
            };
            normalized.push_line(body, line_start, skip);
            if body.len() < line.len() {
                let newline = line_start + body.len();
                normalized.push("\n", newline, newline + 1);
            }
            line_start += line.len();
        }
        normalized
    }

    fn push_line(&mut self, body: &str, base: usize, skip: usize) {
        let mut separator: Option<usize> = None;
        let mut emitted = false;
        for (i, ch) in body.char_indices().skip_while(|&(i, _)| i < skip) {
            let at = base + i;
            if ch.is_alphanumeric() {
                if let Some(run_start) = separator.take() {
                    if emitted {
                        self.push(" ", run_start, at);
                    }
                }
                let end = at + ch.len_utf8();
                let mut buf = [0u8; 4];
                for lower in ch.to_lowercase() {
                    self.push(lower.encode_utf8(&mut buf), at, end);
                }
                emitted = true;
            } else if separator.is_none() {
                separator = Some(at);
            }
        }
    }

    fn push(&mut self, s: &str, start: usize, end: usize) {
        self.text.push_str(s);
        self.orig_start.extend(std::iter::repeat_n(start, s.len()));
        self.orig_end.extend(std::iter::repeat_n(end, s.len()));
    }

    #[must_use]
    /// The normalised text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    /// Whether normalisation left nothing.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Every occurrence of `needle` whose original span lies within `[lo, hi)`.
    ///
    /// Occurrences must end on a word boundary, and with `line_anchored` must also begin a
    /// normalised line. Results are original `(start, end)` byte spans in document order.
    pub fn find_all<'a>(
        &'a self,
        needle: &'a str,
        lo: usize,
        hi: usize,
        line_anchored: bool,
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        let from = self.orig_start.partition_point(|&start| start < lo);
        let to = self.orig_end.partition_point(|&end| end <= hi).max(from);
        let window = self.text.get(from..to).unwrap_or_default();
        let bytes = self.text.as_bytes();
        let needle_len = needle.len();
        window
            .match_indices(needle)
            .filter(move |_| needle_len > 0)
            .map(move |(i, _)| (from + i, from + i + needle_len))
            .filter(move |&(start, end)| {
                let starts_line = start == 0 || bytes[start - 1] == b'\n';
                let ends_word = end == bytes.len() || matches!(bytes[end], b' ' | b'\n');
                ends_word && (starts_line || !line_anchored)
            })
            .map(move |(start, end)| (self.orig_start[start], self.orig_end[end - 1]))
    }
}

#[cfg(test)]
#[path = "tests/normalize.rs"]
mod tests;
