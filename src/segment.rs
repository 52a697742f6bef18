//! Resolved spans of raw text bound to outline nodes.
//!
//! Segments are terminal values: once the resolver produces one it is never edited, only
//! replaced by a fresh value (for instance when the materializer trims an overhanging end).

use crate::matching::MatchTier;
use crate::node::{NodeId, NodeRecord};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// How a segment's heading was located.
pub enum Method {
    /// Literal match of the title or its de-numbered form.
    Exact,
    /// Match after stripping numbering, punctuation and case.
    Normalized,
    /// Best similarity-ratio line above the acceptance threshold.
    Fuzzy,
    /// Every tier failed.
    Unresolved,
}

impl From<MatchTier> for Method {
    fn from(tier: MatchTier) -> Self {
        match tier {
            MatchTier::Exact => Self::Exact,
            MatchTier::Normalized => Self::Normalized,
            MatchTier::Fuzzy => Self::Fuzzy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A node's content as a byte span of the raw text.
pub struct Segment {
    /// Node the span belongs to.
    pub node_id: NodeId,
    /// First byte of the content (just past the heading).
    pub start_offset: usize,
    /// One past the last byte of the content.
    pub end_offset: usize,
    /// Tier that located the heading.
    pub method: Method,
    /// Trust in the span, in `0.0..=1.0`.
    pub confidence: f64,
    /// Start of the matched heading's line, `#` marks included; equals `start_offset` for synthetic
    /// nodes.
    pub heading_offset: usize,
}

impl Segment {
    #[must_use]
    /// Placeholder for a node no tier could place.
    pub fn unresolved(node_id: NodeId) -> Self {
        Self {
            node_id,
            start_offset: 0,
            end_offset: 0,
            method: Method::Unresolved,
            confidence: 0.0,
            heading_offset: 0,
        }
    }

    #[must_use]
    /// Whether the span points into the text at all.
    pub fn is_resolved(&self) -> bool {
        self.method != Method::Unresolved
    }

    #[must_use]
    /// Length of the content in bytes.
    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    #[must_use]
    /// Whether the content span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    /// The segment's content, as handed to downstream consumers.
    pub fn text<'t>(&self, raw_text: &'t str) -> &'t str {
        raw_text
            .get(self.start_offset..self.end_offset)
            .unwrap_or_default()
    }

    #[must_use]
    /// The matched heading text preceding the content.
    pub fn heading<'t>(&self, raw_text: &'t str) -> &'t str {
        raw_text
            .get(self.heading_offset..self.start_offset)
            .unwrap_or_default()
    }

    #[must_use]
    /// A replacement segment ending earlier, never before its own start.
    pub fn truncated(&self, end_offset: usize) -> Self {
        Self {
            end_offset: end_offset.clamp(self.start_offset, self.end_offset),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Explicit record of a node that could not be placed in the text.
pub struct UnresolvedMarker {
    /// The node that failed.
    pub node_id: NodeId,
    /// Its title, for reporting.
    pub title: String,
}

impl From<&NodeRecord> for UnresolvedMarker {
    fn from(node: &NodeRecord) -> Self {
        Self {
            node_id: node.id,
            title: node.title.clone(),
        }
    }
}
