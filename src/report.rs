//! Structured progress reporting.
//!
//! Every stage reports what it does through a [`Reporter`] instead of printing, so the same run can
//! be silent in a library, forwarded to `log` in the CLI, collected for inspection in tests, or
//! streamed as JSON lines to another process. Warnings are also aggregated into the per-document
//! [`Summary`] independently of which reporter is installed.

use crate::matching::MatchTier;
use crate::node::NodeId;
use crate::segment::Method;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// A non-fatal condition met while resolving a document.
pub enum Warning {
    /// A synthetic node was inserted to repair the hierarchy.
    GapInserted {
        /// The new node.
        node_id: NodeId,
        /// Its generated title.
        title: String,
        /// Its level.
        level: usize,
        /// The node it was inserted under.
        parent: NodeId,
        /// The node it was inserted above.
        child: NodeId,
    },
    /// No tier could place a node's heading.
    BoundaryUnresolved {
        /// The node that failed.
        node_id: NodeId,
        /// Its title.
        title: String,
    },
    /// Non-blank text is not covered by any segment.
    CoverageGap {
        /// First uncovered byte.
        start: usize,
        /// One past the last uncovered byte.
        end: usize,
    },
    /// A resolved segment failed its self-consistency check.
    CanaryFailed {
        /// The node whose segment failed.
        node_id: NodeId,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
/// Per-document outcome counts for the caller to inspect.
pub struct Summary {
    /// Segments placed by literal matching.
    pub exact: usize,
    /// Segments placed after normalisation.
    pub normalized: usize,
    /// Segments placed by similarity ratio.
    pub fuzzy: usize,
    /// Nodes no tier could place.
    pub unresolved: usize,
    /// Nodes inserted by the pipeline (implicit root and gap fillers).
    pub synthetic: usize,
    /// Uncovered stretches of non-blank text.
    pub coverage_gaps: usize,
    /// Share of the text's bytes covered by emitted segments.
    pub coverage_ratio: f64,
    /// Every warning raised, in the order raised.
    pub warnings: Vec<Warning>,
}

impl Summary {
    /// Counts a segment under the tier that produced it.
    pub fn record_method(&mut self, method: Method) {
        match method {
            Method::Exact => self.exact += 1,
            Method::Normalized => self.normalized += 1,
            Method::Fuzzy => self.fuzzy += 1,
            Method::Unresolved => self.unresolved += 1,
        }
    }

    /// Keeps a warning, counting coverage gaps.
    pub fn push_warning(&mut self, warning: Warning) {
        if matches!(warning, Warning::CoverageGap { .. }) {
            self.coverage_gaps += 1;
        }
        self.warnings.push(warning);
    }

    #[must_use]
    /// Total segments located by any tier.
    pub fn resolved(&self) -> usize {
        self.exact + self.normalized + self.fuzzy
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
/// Something a pipeline stage did.
pub enum Event {
    /// A document entered the pipeline.
    DocumentStarted {
        /// Caller-supplied document name.
        document: String,
        /// Headings in the index.
        nodes: usize,
        /// Raw text length in bytes.
        text_len: usize,
    },
    /// One tier was tried for one title.
    TierAttempt {
        /// Node being placed.
        node_id: NodeId,
        /// Tier tried.
        tier: MatchTier,
        /// Window attempt number, from 1.
        attempt: u32,
        /// Whether the tier produced a candidate.
        found: bool,
    },
    /// A node's span was fixed.
    Resolved {
        /// Node placed.
        node_id: NodeId,
        /// How it was placed.
        method: Method,
        /// Confidence attached to the span.
        confidence: f64,
        /// Content start.
        start: usize,
        /// Content end.
        end: usize,
    },
    /// A non-leaf node's own-content flag was decided.
    ContentClassified {
        /// Node classified.
        node_id: NodeId,
        /// Whether it owns text.
        has_content: bool,
    },
    /// A non-fatal condition.
    Warning {
        /// What happened.
        warning: Warning,
    },
    /// A document left the pipeline.
    DocumentFinished {
        /// Caller-supplied document name.
        document: String,
        /// Outcome counts.
        summary: Summary,
    },
}

/// Observer of pipeline events.
pub trait Reporter: Send + Sync {
    /// Receives one event.
    fn report(&self, event: &Event);
}

/// Discards everything.
pub struct Silent;

impl Reporter for Silent {
    fn report(&self, _event: &Event) {}
}

/// Forwards events to the `log` facade at a level fitting each event.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &Event) {
        match event {
            Event::DocumentStarted {
                document,
                nodes,
                text_len,
            } => log::info!("{document}: resolving {nodes} headings against {text_len} bytes"),
            Event::TierAttempt {
                node_id,
                tier,
                attempt,
                found,
            } => log::debug!("node {node_id}: {tier:?} tier (attempt {attempt}) found={found}"),
            Event::Resolved {
                node_id,
                method,
                confidence,
                start,
                end,
            } => log::debug!("node {node_id}: {method:?} [{start}, {end}) confidence {confidence:.2}"),
            Event::ContentClassified {
                node_id,
                has_content,
            } => log::debug!("node {node_id}: has_content={has_content}"),
            Event::Warning { warning } => log::warn!("{warning:?}"),
            Event::DocumentFinished { document, summary } => log::info!(
                "{document}: {} resolved ({} exact, {} normalized, {} fuzzy), {} unresolved, {} coverage gaps",
                summary.resolved(),
                summary.exact,
                summary.normalized,
                summary.fuzzy,
                summary.unresolved,
                summary.coverage_gaps
            ),
        }
    }
}

#[derive(Default)]
/// Keeps every event in memory.
pub struct Collector {
    events: Mutex<Vec<Event>>,
}

impl Collector {
    #[must_use]
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    /// A copy of everything reported so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Reporter for Collector {
    fn report(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonLines<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLines<W> {
    #[must_use]
    /// Wraps a writer such as stderr.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> Reporter for JsonLines<W> {
    fn report(&self, event: &Event) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            // A closed pipe on the consumer side must not abort resolution
            let _ = writeln!(out, "{line}");
        }
    }
}

#[cfg(test)]
#[path = "tests/report.rs"]
mod tests;
