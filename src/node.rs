//! Node representation for a document's table of contents.
//!
//! A node is one heading of the outline: a title at a nesting level, optionally carrying
//! approximate page or byte-offset hints from whatever produced the index. Nodes track their
//! position in the outline through parent/child relationships, and are enriched in place as the
//! pipeline learns more about them (hierarchy, synthetic gap fillers, own-content flag).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Stable identifier of a node within one document's outline.
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Approximate location of a node in the source, as reported by the index.
///
/// Pages are 1-based and inclusive at both ends. Offsets are byte offsets into the raw text,
/// half-open, and only ever treated as a hint for disambiguation and windowing.
pub struct Hints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// First page the node's content appears on.
    pub start_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Last page the node's content appears on.
    pub end_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Approximate byte offset where the node begins.
    pub start_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Approximate byte offset where the node ends.
    pub end_offset: Option<usize>,
}

impl Hints {
    #[must_use]
    /// Whether any hint is present at all.
    pub fn is_empty(&self) -> bool {
        self.start_page.is_none()
            && self.end_page.is_none()
            && self.start_offset.is_none()
            && self.end_offset.is_none()
    }

    #[must_use]
    /// Last known page, falling back to the first page when no end is recorded.
    pub fn last_page(&self) -> Option<u32> {
        self.end_page.or(self.start_page)
    }

    #[must_use]
    /// Last known offset, falling back to the start offset when no end is recorded.
    pub fn last_offset(&self) -> Option<usize> {
        self.end_offset.or(self.start_offset)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Heading entry as it arrives from an index file, before any normalisation.
pub struct RawHeading {
    /// Identifier assigned by the index producer.
    pub id: u32,
    /// Heading text as printed in the table of contents.
    pub title: String,
    /// Nesting depth (0 for top-level).
    pub level: usize,
    #[serde(flatten)]
    /// Optional page/offset hints.
    pub hints: Hints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Children as claimed by the producer; recomputed from levels and only used as a cross-check.
    pub children_ids: Option<Vec<u32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Outline entry with hierarchy and classification state.
pub struct NodeRecord {
    /// Unique identifier within the document.
    pub id: NodeId,
    /// Normalised heading text.
    pub title: String,
    /// Nesting depth in the outline (0 for top-level).
    pub level: usize,
    #[serde(flatten)]
    /// Approximate location hints.
    pub hints: Hints,
    /// Inserted by the pipeline rather than read from the index.
    pub is_synthetic: bool,
    /// Owns text of its own, directly under its heading.
    pub has_content: bool,
    /// Containing node in the outline.
    pub parent_id: Option<NodeId>,
    /// Directly nested nodes, in document order.
    pub children_ids: Vec<NodeId>,
}

impl NodeRecord {
    #[must_use]
    /// Creates an unlinked node read from an index.
    pub fn new(id: NodeId, title: impl Into<String>, level: usize, hints: Hints) -> Self {
        Self {
            id,
            title: title.into(),
            level,
            hints,
            is_synthetic: false,
            has_content: false,
            parent_id: None,
            children_ids: Vec::new(),
        }
    }

    #[must_use]
    /// Creates an unlinked placeholder node inserted by the pipeline.
    pub fn synthetic(id: NodeId, title: impl Into<String>, level: usize, hints: Hints) -> Self {
        Self {
            is_synthetic: true,
            ..Self::new(id, title, level, hints)
        }
    }

    #[must_use]
    /// Leaves are the smallest content-bearing units of the outline.
    pub fn is_leaf(&self) -> bool {
        self.children_ids.is_empty()
    }

    #[must_use]
    /// Introduction-style headings already cover a parent's lead-in text.
    pub fn is_introduction(&self) -> bool {
        self.title.to_lowercase().contains("introduction")
    }
}
