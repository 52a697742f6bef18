//! Turning raw heading lists into validated node records.
//!
//! Titles are trimmed and their whitespace collapsed; everything else is kept as given, in input
//! order. Input that cannot form an outline at all is rejected here, before any text is searched.

use crate::error::{LoadError, StructuralError};
use crate::formats::Format;
use crate::node::{NodeId, NodeRecord, RawHeading};
use crate::normalize::collapse_whitespace;
use std::collections::HashSet;

/// Validates raw headings and converts them to unlinked node records.
///
/// # Errors
///
/// Returns a [`StructuralError`] for an empty list, a repeated id, a blank title, or a hint whose
/// end precedes its start.
pub fn load(headings: Vec<RawHeading>) -> Result<Vec<NodeRecord>, StructuralError> {
    if headings.is_empty() {
        return Err(StructuralError::EmptyIndex);
    }
    let mut seen = HashSet::with_capacity(headings.len());
    headings
        .into_iter()
        .map(|heading| {
            let id = NodeId(heading.id);
            if !seen.insert(id) {
                return Err(StructuralError::DuplicateId { id });
            }
            let title = collapse_whitespace(&heading.title);
            if title.is_empty() {
                return Err(StructuralError::EmptyTitle { id });
            }
            let hints = heading.hints;
            if let (Some(start), Some(end)) = (hints.start_page, hints.end_page) {
                if end < start {
                    return Err(StructuralError::InvertedHint {
                        id,
                        kind: "page",
                        start: usize::try_from(start).unwrap_or(usize::MAX),
                        end: usize::try_from(end).unwrap_or(usize::MAX),
                    });
                }
            }
            if let (Some(start), Some(end)) = (hints.start_offset, hints.end_offset) {
                if end < start {
                    return Err(StructuralError::InvertedHint {
                        id,
                        kind: "offset",
                        start,
                        end,
                    });
                }
            }
            Ok(NodeRecord::new(id, title, heading.level, hints))
        })
        .collect()
}

/// Parses an index in the given format and loads it.
///
/// # Errors
///
/// Returns an error if the source cannot be decoded or does not form a valid outline.
pub fn load_str(source: &str, format: &dyn Format) -> Result<Vec<NodeRecord>, LoadError> {
    Ok(load(format.parse_index(source)?)?)
}

#[must_use]
/// Children lists as claimed by the index producer, for cross-checking the rebuilt hierarchy.
pub fn claimed_children(headings: &[RawHeading]) -> Vec<(NodeId, Vec<NodeId>)> {
    headings
        .iter()
        .filter_map(|heading| {
            let children = heading.children_ids.as_ref()?;
            Some((
                NodeId(heading.id),
                children.iter().copied().map(NodeId).collect(),
            ))
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/loader.rs"]
mod tests;
