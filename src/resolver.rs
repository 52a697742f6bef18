//! Locating each node's content in the raw text.
//!
//! The resolver walks the outline in document order with a cursor that only moves forward. For
//! every node it finds the node's own heading at or after the cursor, then the next node's heading
//! after that, and the text between the two is the node's content. Headings are looked up with the
//! configured [`MatchTier`] chain, first inside the window suggested by the node's page or offset
//! hints and then in progressively wider windows until the rest of the document has been tried.
//!
//! A node no tier can place becomes an unresolved segment and a warning. The cursor stays where it
//! was, so one bad title cannot derail the nodes after it.

use crate::adjudicator::{Adjudication, Candidate};
use crate::matching::{as_f64, heading_line_start, MatchResult, MatchSettings, MatchTier, Matcher};
use crate::node::{Hints, NodeId, NodeRecord};
use crate::pages::{PageIndex, DEFAULT_MARKER};
use crate::report::{Event, Reporter, Warning};
use crate::retry::RetryPolicy;
use crate::segment::{Method, Segment};
use crate::tree::NodeTree;
use regex::Regex;
use std::ops::Range;
use thiserror::Error;

#[derive(Clone, Debug)]
/// Everything the resolver can be tuned with.
pub struct ResolverSettings {
    /// Tiers to try, in order.
    pub tiers: Vec<MatchTier>,
    /// Per-tier matching knobs.
    pub matching: MatchSettings,
    /// Page marker pattern; its first capture group is the page number.
    pub page_marker: Regex,
    /// Window widening schedule, also applied to adjudicator calls.
    pub retry: RetryPolicy,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            tiers: MatchTier::ALL.to_vec(),
            matching: MatchSettings::default(),
            page_marker: DEFAULT_MARKER.clone(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("no matching tier located the heading")]
/// Every tier failed in every window.
pub struct NotFound;

/// Confidence factor for headings the exact tier cannot confirm.
pub const APPROXIMATE_WEIGHT: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Outcome of the self-consistency check on a resolved span.
pub enum Canary {
    /// Exact matching finds the title on the heading line.
    Confirmed,
    /// Only the approximate tier that placed the heading finds it again.
    Approximate,
    /// The span is malformed or its heading is not the title.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Where a node's heading and content lie.
pub struct Boundary {
    /// The node's own heading.
    pub heading: MatchResult,
    /// Content start, just past the heading.
    pub start: usize,
    /// Content end.
    pub end: usize,
    /// Where the following node's heading was found, if it was.
    pub next_heading: Option<usize>,
}

/// Sequential span resolver for one document.
pub struct BoundaryResolver<'a> {
    matcher: Matcher<'a>,
    pages: PageIndex,
    settings: &'a ResolverSettings,
    adjudication: Option<&'a Adjudication>,
    reporter: &'a dyn Reporter,
    cursor: usize,
    warnings: Vec<Warning>,
}

impl<'a> BoundaryResolver<'a> {
    #[must_use]
    /// Prepares resolution over `raw_text` with the cursor at the start.
    pub fn new(
        raw_text: &'a str,
        settings: &'a ResolverSettings,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            matcher: Matcher::new(raw_text, settings.matching),
            pages: PageIndex::new(raw_text, &settings.page_marker),
            settings,
            adjudication: None,
            reporter,
            cursor: 0,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    /// Lets fuzzy ties be broken by an external adjudicator.
    pub fn with_adjudication(mut self, adjudication: Option<&'a Adjudication>) -> Self {
        self.adjudication = adjudication;
        self
    }

    #[must_use]
    /// Current search cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    /// Page markers found in the text.
    pub fn pages(&self) -> &PageIndex {
        &self.pages
    }

    /// Warnings raised so far, draining them.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Resolves every node of `tree` in document order, one segment per node.
    ///
    /// A segment whose end ran past the next resolved heading (because the node after it could not
    /// be placed) is replaced by one ending at that heading, so resolved spans never overlap.
    pub fn resolve_tree(&mut self, tree: &NodeTree) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::with_capacity(tree.len());
        let mut last_resolved: Option<usize> = None;
        for (position, node) in tree.iter().enumerate() {
            let parent = node
                .parent_id
                .and_then(|id| tree.position(id))
                .and_then(|p| segments.get(p));
            let next = tree.nodes().get(position + 1);
            let segment = if node.is_synthetic {
                self.resolve_synthetic(node, parent, next)
            } else {
                self.resolve_node(node, next)
            };
            if segment.is_resolved() {
                if let Some(previous) = last_resolved.and_then(|p| segments.get_mut(p)) {
                    if previous.end_offset > segment.heading_offset {
                        *previous = previous.truncated(segment.heading_offset);
                    }
                }
                last_resolved = Some(position);
            }
            segments.push(segment);
        }
        segments
    }

    /// Places one indexed node at or after the cursor, advancing the cursor on success.
    pub fn resolve_node(&mut self, node: &NodeRecord, next: Option<&NodeRecord>) -> Segment {
        match self.locate(node, next, self.cursor) {
            Ok(boundary) => {
                self.cursor = boundary.next_heading.unwrap_or(boundary.start);
                let weighted = boundary.heading.tier.weight() * boundary.heading.score;
                let confidence = match self.canary(&node.title, &boundary) {
                    Canary::Confirmed => weighted,
                    Canary::Approximate => weighted * APPROXIMATE_WEIGHT,
                    Canary::Failed => {
                        self.warn(Warning::CanaryFailed { node_id: node.id });
                        0.0
                    }
                };
                self.finish(Segment {
                    node_id: node.id,
                    start_offset: boundary.start,
                    end_offset: boundary.end,
                    method: boundary.heading.tier.into(),
                    confidence,
                    heading_offset: heading_line_start(self.matcher.raw(), boundary.heading.position),
                })
            }
            Err(NotFound) => {
                self.warn(Warning::BoundaryUnresolved {
                    node_id: node.id,
                    title: node.title.clone(),
                });
                Segment::unresolved(node.id)
            }
        }
    }

    /// Places a synthetic node at its parent's content start without searching for its title.
    pub fn resolve_synthetic(
        &mut self,
        node: &NodeRecord,
        parent: Option<&Segment>,
        next: Option<&NodeRecord>,
    ) -> Segment {
        let (start, method, confidence) = match parent {
            None => (0, Method::Exact, 1.0),
            Some(parent) if parent.is_resolved() => {
                (parent.start_offset, parent.method, parent.confidence)
            }
            Some(_) => return Segment::unresolved(node.id),
        };
        let next_heading = self.end_boundary(start, next);
        self.cursor = next_heading.unwrap_or(start).max(self.cursor);
        self.finish(Segment {
            node_id: node.id,
            start_offset: start,
            end_offset: self.end_for(start, next, next_heading),
            method,
            confidence,
            heading_offset: start,
        })
    }

    /// Locates `node`'s heading and content end, searching from `cursor`.
    ///
    /// Deterministic: the same text, titles, hints and cursor always give the same boundary.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no tier places the node's heading in any window.
    pub fn locate(
        &self,
        node: &NodeRecord,
        next: Option<&NodeRecord>,
        cursor: usize,
    ) -> Result<Boundary, NotFound> {
        let heading = self
            .search(node.id, &node.title, &node.hints, cursor)
            .ok_or(NotFound)?;
        let start = heading.end;
        let next_heading = self.end_boundary(start, next);
        Ok(Boundary {
            heading,
            start,
            end: self.end_for(start, next, next_heading),
            next_heading,
        })
    }

    fn end_boundary(&self, start: usize, next: Option<&NodeRecord>) -> Option<usize> {
        let next = next.filter(|n| !n.is_synthetic)?;
        self.search(next.id, &next.title, &next.hints, start)
            .map(|found| heading_line_start(self.matcher.raw(), found.position).max(start))
    }

    fn end_for(
        &self,
        start: usize,
        next: Option<&NodeRecord>,
        next_heading: Option<usize>,
    ) -> usize {
        match (next, next_heading) {
            (_, Some(found)) => found,
            // A synthetic successor takes over this node's content
            (Some(next), None) if next.is_synthetic => start,
            _ => self.matcher.raw().len(),
        }
    }

    #[must_use]
    /// Finds a title's heading at or after `from`, widening the window per attempt.
    pub fn search(
        &self,
        node_id: NodeId,
        title: &str,
        hints: &Hints,
        from: usize,
    ) -> Option<MatchResult> {
        let hint_offset = self.hint_offset(hints);
        self.windows(hints, from)
            .into_iter()
            .zip(1u32..)
            .find_map(|(window, attempt)| {
                self.settings.tiers.iter().find_map(|&tier| {
                    let candidates = self.matcher.find(tier, title, window.clone());
                    self.reporter.report(&Event::TierAttempt {
                        node_id,
                        tier,
                        attempt,
                        found: !candidates.is_empty(),
                    });
                    self.pick(title, &candidates, hint_offset)
                })
            })
    }

    /// Chooses among candidates: adjudicated for fuzzy ties, else nearest the hint, else first.
    fn pick(
        &self,
        title: &str,
        candidates: &[MatchResult],
        hint: Option<usize>,
    ) -> Option<MatchResult> {
        if let (Some(adjudication), [first, _, ..]) = (self.adjudication, candidates) {
            if first.tier == MatchTier::Fuzzy {
                let offered: Vec<_> = candidates
                    .iter()
                    .map(|c| Candidate {
                        position: c.position,
                        line: self.matcher.raw()[c.position..c.end].to_string(),
                        score: c.score,
                    })
                    .collect();
                if let Some(choice) = adjudication.choose(title, &offered) {
                    return candidates.get(choice).copied();
                }
            }
        }
        match hint {
            Some(hint) => candidates
                .iter()
                .min_by_key(|c| c.position.abs_diff(hint))
                .copied(),
            None => candidates.first().copied(),
        }
    }

    fn hint_offset(&self, hints: &Hints) -> Option<usize> {
        hints.start_offset.or_else(|| {
            let first = hints.start_page?;
            Some(self.pages.window(first, first)?.start)
        })
    }

    /// Search windows for one title: the hinted region, wider regions, then everything after `from`.
    fn windows(&self, hints: &Hints, from: usize) -> Vec<Range<usize>> {
        let len = self.matcher.raw().len();
        let from = from.min(len);
        let full = from..len;
        let hinted = hints
            .start_page
            .and_then(|first| self.pages.window(first, hints.last_page().unwrap_or(first)))
            .or_else(|| {
                let start = hints.start_offset?;
                let end = hints.end_offset.filter(|&end| end > start).unwrap_or(len);
                Some(start.min(len)..end.min(len))
            });
        let Some(hinted) = hinted else {
            return vec![full];
        };

        let retry = &self.settings.retry;
        let mut windows: Vec<Range<usize>> = Vec::new();
        for attempt in 1..retry.attempts() {
            let pad = scale(hinted.len().max(1), retry.factor(attempt) - 1.0) / 2;
            let lo = hinted.start.saturating_sub(pad).max(from);
            let hi = hinted.end.saturating_add(pad).min(len).max(lo);
            if windows.last() != Some(&(lo..hi)) {
                windows.push(lo..hi);
            }
        }
        if windows.last() != Some(&full) {
            windows.push(full);
        }
        windows
    }

    #[must_use]
    /// Re-submits `title` to exact matching over the span from the heading line to the content end.
    ///
    /// The title must be found on the heading line itself. A normalized or fuzzy heading the exact
    /// tier cannot confirm is still [`Canary::Approximate`] if its own tier re-finds it in place.
    pub fn canary(&self, title: &str, boundary: &Boundary) -> Canary {
        let raw = self.matcher.raw();
        let heading = boundary.heading;
        let line = heading_line_start(raw, heading.position);
        let ordered = line <= heading.position
            && heading.position < heading.end
            && heading.end <= boundary.start
            && boundary.start <= boundary.end
            && boundary.end <= raw.len();
        if !ordered {
            return Canary::Failed;
        }
        let confirmed = self
            .matcher
            .find(MatchTier::Exact, title, line..boundary.end)
            .first()
            .is_some_and(|hit| heading_line_start(raw, hit.position) == line);
        if confirmed {
            return Canary::Confirmed;
        }
        let refound = heading.tier != MatchTier::Exact
            && self
                .matcher
                .find(heading.tier, title, line..heading.end)
                .iter()
                .any(|hit| hit.position == heading.position);
        if refound {
            Canary::Approximate
        } else {
            Canary::Failed
        }
    }

    fn finish(&self, segment: Segment) -> Segment {
        self.reporter.report(&Event::Resolved {
            node_id: segment.node_id,
            method: segment.method,
            confidence: segment.confidence,
            start: segment.start_offset,
            end: segment.end_offset,
        });
        segment
    }

    fn warn(&mut self, warning: Warning) {
        self.reporter.report(&Event::Warning {
            warning: warning.clone(),
        });
        self.warnings.push(warning);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(len: usize, factor: f64) -> usize {
    (as_f64(len) * factor).clamp(0.0, f64::from(u32::MAX)) as usize
}

#[cfg(test)]
#[path = "tests/resolver.rs"]
mod tests;
