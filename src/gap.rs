//! Repairing holes in the outline.
//!
//! Tables of contents often skip a level (a chapter followed straight by sub-subsections) or leave
//! a chapter's lead-in text without an entry of its own. Both are filled with synthetic
//! introduction nodes titled after the parent's numbering, so every piece of text has a node to
//! belong to. Insertion is liberal: awkward spans are clamped rather than refused, and only hints
//! that run backwards abort the document.

use crate::error::StructuralError;
use crate::hierarchy::link;
use crate::node::{Hints, NodeId, NodeRecord};
use crate::normalize::introduction_title;
use crate::report::Warning;
use crate::tree::NodeTree;

#[derive(Clone, Debug, PartialEq, Eq)]
/// When gaps are filled.
pub struct GapSettings {
    /// Largest level increase from parent to child that is not a gap.
    pub max_level_step: usize,
    /// Also add an introduction when a parent's first child starts on a later page.
    pub introduce_page_gaps: bool,
}

impl Default for GapSettings {
    fn default() -> Self {
        Self {
            max_level_step: 1,
            introduce_page_gaps: false,
        }
    }
}

struct Open {
    index: usize,
    has_children: bool,
}

/// Inserts synthetic nodes where the outline skips levels or pages, then relinks the tree.
///
/// Each level jump larger than `max_level_step` gets one nested node per missing step, placed
/// directly after the parent. The nodes between parent and child take the span from the parent's
/// end to the child's start.
///
/// # Errors
///
/// Returns [`StructuralError::NonMonotonicHints`] when a child at a gap starts before its parent,
/// and any error from rebuilding the tree.
pub fn fill_gaps(
    tree: NodeTree,
    settings: &GapSettings,
) -> Result<(NodeTree, Vec<Warning>), StructuralError> {
    let step = settings.max_level_step.max(1);
    let mut next_id = tree.next_free_id();
    let records = tree.into_records();
    let mut out: Vec<NodeRecord> = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();
    let mut open: Vec<Open> = Vec::new();

    for node in records {
        while open.last().is_some_and(|top| out[top.index].level >= node.level) {
            open.pop();
        }

        if let Some(top) = open.last() {
            let parent = &out[top.index];
            if node.level - parent.level > step {
                check_monotonic(parent, &node)?;
                let mut level = parent.level + step;
                while level < node.level {
                    let parent = &out[open.last().map_or(0, |o| o.index)];
                    let synthetic = NodeRecord::synthetic(
                        next_id,
                        introduction_title(&parent.title),
                        level,
                        gap_span(&parent.hints, &node.hints),
                    );
                    next_id = NodeId(next_id.0.saturating_add(1));
                    warnings.push(inserted(&synthetic, parent.id, node.id));
                    if let Some(top) = open.last_mut() {
                        top.has_children = true;
                    }
                    out.push(synthetic);
                    open.push(Open {
                        index: out.len() - 1,
                        has_children: false,
                    });
                    level += step;
                }
            }
        }

        // Page-gap introductions are siblings at the child's own level, not intermediate levels
        if settings.introduce_page_gaps {
            if let Some(top) = open.last() {
                let parent = &out[top.index];
                if !top.has_children && needs_page_introduction(parent, &node) {
                    check_monotonic(parent, &node)?;
                    let mut hints = Hints::default();
                    (hints.start_page, hints.end_page) =
                        clamp_pages(parent.hints.start_page, node.hints.start_page);
                    let synthetic = NodeRecord::synthetic(
                        next_id,
                        introduction_title(&parent.title),
                        node.level,
                        hints,
                    );
                    next_id = NodeId(next_id.0.saturating_add(1));
                    warnings.push(inserted(&synthetic, parent.id, node.id));
                    out.push(synthetic);
                }
            }
        }

        if let Some(top) = open.last_mut() {
            top.has_children = true;
        }
        out.push(node);
        open.push(Open {
            index: out.len() - 1,
            has_children: false,
        });
    }

    if !warnings.is_empty() {
        log::debug!("inserted {} synthetic nodes", warnings.len());
    }
    link(&mut out);
    let tree = NodeTree::from_records(out)?;
    tree.check_levels()?;
    Ok((tree, warnings))
}

fn needs_page_introduction(parent: &NodeRecord, child: &NodeRecord) -> bool {
    if parent.is_synthetic || child.is_introduction() {
        return false;
    }
    matches!(
        (parent.hints.start_page, child.hints.start_page),
        (Some(parent_page), Some(child_page)) if child_page > parent_page
    )
}

fn check_monotonic(parent: &NodeRecord, child: &NodeRecord) -> Result<(), StructuralError> {
    let pages = (parent.hints.start_page, child.hints.start_page);
    if let (Some(parent_start), Some(child_start)) = pages {
        if child_start < parent_start {
            return Err(StructuralError::NonMonotonicHints {
                parent: parent.id,
                child: child.id,
                parent_start: usize::try_from(parent_start).unwrap_or(usize::MAX),
                child_start: usize::try_from(child_start).unwrap_or(usize::MAX),
            });
        }
    }
    if let (Some(parent_start), Some(child_start)) =
        (parent.hints.start_offset, child.hints.start_offset)
    {
        if child_start < parent_start {
            return Err(StructuralError::NonMonotonicHints {
                parent: parent.id,
                child: child.id,
                parent_start,
                child_start,
            });
        }
    }
    Ok(())
}

fn inserted(synthetic: &NodeRecord, parent: NodeId, child: NodeId) -> Warning {
    Warning::GapInserted {
        node_id: synthetic.id,
        title: synthetic.title.clone(),
        level: synthetic.level,
        parent,
        child,
    }
}

/// Span between the end of the parent and the start of the child.
fn gap_span(parent: &Hints, child: &Hints) -> Hints {
    let (start_page, end_page) = clamp_pages(parent.last_page(), child.start_page);
    let (start_offset, end_offset) = clamp_offsets(parent.last_offset(), child.start_offset);
    Hints {
        start_page,
        end_page,
        start_offset,
        end_offset,
    }
}

/// Inclusive page span; an inverted one collapses onto its end page.
pub(crate) fn clamp_pages(lo: Option<u32>, hi: Option<u32>) -> (Option<u32>, Option<u32>) {
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi < lo => (Some(hi), Some(hi)),
        (Some(lo), Some(hi)) => (Some(lo), Some(hi)),
        (one, None) | (None, one) => (one, one),
    }
}

/// Half-open offset span; an empty or inverted one becomes the single byte before its end, or
/// the first byte when it ends at 0.
pub(crate) fn clamp_offsets(lo: Option<usize>, hi: Option<usize>) -> (Option<usize>, Option<usize>) {
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi <= lo => unit_before(hi),
        (Some(lo), Some(hi)) => (Some(lo), Some(hi)),
        (Some(lo), None) => (Some(lo), None),
        (None, Some(hi)) => unit_before(hi),
        (None, None) => (None, None),
    }
}

fn unit_before(hi: usize) -> (Option<usize>, Option<usize>) {
    let hi = hi.max(1);
    (Some(hi - 1), Some(hi))
}

#[cfg(test)]
#[path = "tests/gap.rs"]
mod tests;
