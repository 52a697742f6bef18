//! Format trait and implementations for the node index inputs.
//!
//! An index is the table of contents of a document: an ordered list of headings with nesting
//! levels. Producers hand it over either as a JSON node array or as a Markdown outline, and each
//! format turns its source into the same [`RawHeading`] list for the loader.

pub mod json;
pub mod markdown;

use crate::error::LoadError;
use crate::node::RawHeading;
use std::path::Path;

/// A serialisation of a node index.
pub trait Format {
    /// File name suffix that identifies this format during discovery (e.g. `.nodes.json`).
    fn file_suffix(&self) -> &'static str;

    /// Reads the index into raw headings, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be decoded in this format.
    fn parse_index(&self, source: &str) -> Result<Vec<RawHeading>, LoadError>;
}

#[must_use]
/// Picks the format for an index file by its name, defaulting to JSON.
pub fn for_path(path: &Path) -> Box<dyn Format + Send + Sync> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let is_markdown = Path::new(&name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    if is_markdown {
        Box::new(markdown::MarkdownOutline)
    } else {
        Box::new(json::JsonIndex)
    }
}
