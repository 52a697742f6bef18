//! Page markers in extracted text.
//!
//! Text extractors commonly emit a marker line such as `## Page 12` at each page break. Indexing
//! those markers lets page hints from a table of contents narrow the search for a heading down to
//! the bytes of the hinted pages.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Default marker: a Markdown heading line holding only `Page N` (or the Korean `페이지 N`).
pub const DEFAULT_PAGE_MARKER: &str = r"(?m)^#{1,6}\s*(?:[Pp]age|페이지)\s+(\d+)\s*$";

/// [`DEFAULT_PAGE_MARKER`], compiled.
pub static DEFAULT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_PAGE_MARKER).expect("default page marker is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// One page marker found in the text.
pub struct PageMarker {
    /// Page number the marker announces.
    pub page: u32,
    /// Byte offset where the marker line starts.
    pub offset: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Page markers of one text, in document order.
pub struct PageIndex {
    markers: Vec<PageMarker>,
    len: usize,
}

impl PageIndex {
    #[must_use]
    /// Scans `raw_text` for marker lines. The pattern's first capture group is the page number.
    pub fn new(raw_text: &str, pattern: &Regex) -> Self {
        let markers = pattern
            .captures_iter(raw_text)
            .filter_map(|caps| {
                let page = caps.get(1)?.as_str().parse().ok()?;
                let offset = caps.get(0)?.start();
                Some(PageMarker { page, offset })
            })
            .collect();
        Self {
            markers,
            len: raw_text.len(),
        }
    }

    #[must_use]
    /// Whether the text carries no page markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[must_use]
    /// The markers found, in document order.
    pub fn markers(&self) -> &[PageMarker] {
        &self.markers
    }

    #[must_use]
    /// Byte range covering pages `first..=last`.
    ///
    /// Starts at the last marker numbered at or before `first` (or the start of the text) and ends
    /// at the first later marker numbered after `last` (or the end of the text). Returns `None`
    /// when the text has no markers, since the page hints then say nothing about bytes.
    pub fn window(&self, first: u32, last: u32) -> Option<Range<usize>> {
        if self.markers.is_empty() {
            return None;
        }
        let last = last.max(first);
        let start_index = self.markers.iter().rposition(|m| m.page <= first);
        let start = start_index.map_or(0, |i| self.markers[i].offset);
        let end = self.markers[start_index.map_or(0, |i| i + 1)..]
            .iter()
            .find(|m| m.page > last)
            .map_or(self.len, |m| m.offset);
        Some(start..end.max(start))
    }
}

#[cfg(test)]
#[path = "tests/pages.rs"]
mod tests;
