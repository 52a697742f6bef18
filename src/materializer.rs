//! Final segment list for a resolved outline.
//!
//! Walks the outline in document order and keeps a segment for every leaf and every non-leaf that
//! owns text. Unresolved leaves are listed explicitly instead of disappearing. Text that no
//! segment or heading covers is reported as a coverage gap.

use crate::classifier::ContentRules;
use crate::matching::as_f64;
use crate::report::Warning;
use crate::segment::{Segment, UnresolvedMarker};
use crate::tree::NodeTree;
use serde::Serialize;
use std::ops::Range;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
/// Ordered output of one document.
pub struct Materialized {
    /// Non-overlapping segments in document order.
    pub segments: Vec<Segment>,
    /// Leaves no tier could place.
    pub unresolved: Vec<UnresolvedMarker>,
    /// Coverage gaps found.
    pub warnings: Vec<Warning>,
    /// Share of the text's bytes inside emitted segments; 0 for an empty text.
    pub coverage_ratio: f64,
}

/// Selects, trims and checks the segments to hand downstream.
///
/// `resolved` holds one segment per node of `tree`, in the same order.
#[must_use]
pub fn materialize(
    tree: &NodeTree,
    resolved: &[Segment],
    raw_text: &str,
    rules: &ContentRules,
) -> Materialized {
    let next_headings = next_resolved_headings(resolved);
    let mut out = Materialized::default();

    for ((node, segment), next_heading) in tree.iter().zip(resolved).zip(next_headings) {
        if !(node.is_leaf() || node.has_content) {
            continue;
        }
        if !segment.is_resolved() {
            if node.is_leaf() {
                out.unresolved.push(UnresolvedMarker::from(node));
            }
            continue;
        }
        let segment = match next_heading {
            Some(heading) if heading < segment.end_offset => {
                log::debug!(
                    "node {}: trimming end {} back to next heading at {heading}",
                    node.id,
                    segment.end_offset
                );
                segment.truncated(heading)
            }
            _ => segment.clone(),
        };
        out.segments.push(segment);
    }

    debug_assert!(
        out.segments
            .windows(2)
            .all(|pair| pair[0].end_offset <= pair[1].start_offset),
        "materialized segments overlap"
    );

    let covered: usize = out.segments.iter().map(Segment::len).sum();
    out.coverage_ratio = if raw_text.is_empty() {
        0.0
    } else {
        as_f64(covered) / as_f64(raw_text.len())
    };

    out.warnings = uncovered(resolved, &out.segments, raw_text.len())
        .into_iter()
        .filter(|gap| raw_text.get(gap.clone()).is_some_and(|text| rules.owns_text(text)))
        .map(|gap| Warning::CoverageGap {
            start: gap.start,
            end: gap.end,
        })
        .collect();
    out
}

/// For each position, the heading offset of the first later resolved segment.
fn next_resolved_headings(resolved: &[Segment]) -> Vec<Option<usize>> {
    let mut next = vec![None; resolved.len()];
    let mut upcoming = None;
    for (position, segment) in resolved.iter().enumerate().rev() {
        next[position] = upcoming;
        if segment.is_resolved() {
            upcoming = Some(segment.heading_offset);
        }
    }
    next
}

/// Ranges covered neither by an emitted segment nor by any resolved heading.
fn uncovered(resolved: &[Segment], emitted: &[Segment], len: usize) -> Vec<Range<usize>> {
    let mut covered: Vec<Range<usize>> = resolved
        .iter()
        .filter(|s| s.is_resolved())
        .map(|s| s.heading_offset..s.start_offset)
        .chain(emitted.iter().map(|s| s.start_offset..s.end_offset))
        .filter(|range| !range.is_empty())
        .collect();
    covered.sort_by_key(|range| range.start);

    let mut gaps = Vec::new();
    let mut reached = 0;
    for range in covered {
        if range.start > reached {
            gaps.push(reached..range.start.min(len));
        }
        reached = reached.max(range.end);
    }
    if reached < len {
        gaps.push(reached..len);
    }
    gaps
}

#[cfg(test)]
#[path = "tests/materializer.rs"]
mod tests;
