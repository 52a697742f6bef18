//! The whole resolution chain for one or many documents.
//!
//! A document goes through loading, hierarchy building, gap filling, boundary resolution, content
//! classification and materialisation, strictly in that order and on one thread, because the
//! resolver's cursor depends on every earlier node. Separate documents share nothing, so a batch
//! is spread over the rayon thread pool.

use crate::adjudicator::{Adjudication, Adjudicator};
use crate::classifier::{classify, ContentRules};
use crate::error::StructuralError;
use crate::gap::{fill_gaps, GapSettings};
use crate::hierarchy::{self, DEFAULT_ROOT_TITLE};
use crate::loader;
use crate::materializer::materialize;
use crate::node::{NodeId, RawHeading};
use crate::report::{Event, Reporter, Silent, Summary, Warning};
use crate::resolver::{BoundaryResolver, ResolverSettings};
use crate::segment::{Method, Segment, UnresolvedMarker};
use crate::tree::NodeTree;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
/// Settings for every stage.
pub struct Settings {
    /// Title of the implicit root added to outlines that do not start at level 0.
    pub root_title: String,
    /// Gap filling.
    pub gaps: GapSettings,
    /// Boundary resolution.
    pub resolver: ResolverSettings,
    /// Non-whitespace characters a line needs to count as content.
    pub min_content_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_title: DEFAULT_ROOT_TITLE.to_string(),
            gaps: GapSettings::default(),
            resolver: ResolverSettings::default(),
            min_content_chars: 1,
        }
    }
}

impl Settings {
    #[must_use]
    /// Content rules derived from these settings.
    pub fn content_rules(&self) -> ContentRules {
        ContentRules {
            min_content_chars: self.min_content_chars,
            page_marker: self.resolver.page_marker.clone(),
        }
    }
}

#[derive(Clone, Debug)]
/// One document to resolve.
pub struct DocumentInput {
    /// Name used in events and results.
    pub name: String,
    /// The table of contents.
    pub headings: Vec<RawHeading>,
    /// The extracted text.
    pub raw_text: String,
}

#[derive(Clone, Debug, Serialize)]
/// Everything learned about one document.
pub struct DocumentResult {
    /// Name the document was submitted under.
    pub document: String,
    /// The enriched outline.
    pub tree: NodeTree,
    /// Content spans in document order.
    pub segments: Vec<Segment>,
    /// Leaves that could not be placed.
    pub unresolved: Vec<UnresolvedMarker>,
    /// Outcome counts and warnings.
    pub summary: Summary,
}

/// Configured resolution chain.
pub struct Pipeline {
    settings: Settings,
    reporter: Arc<dyn Reporter>,
    adjudication: Option<Adjudication>,
}

impl Pipeline {
    #[must_use]
    /// A silent pipeline with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            reporter: Arc::new(Silent),
            adjudication: None,
        }
    }

    #[must_use]
    /// Sends events to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    /// Lets `adjudicator` break fuzzy ties, each call bounded by `timeout` and retried per the
    /// resolver's retry policy.
    pub fn with_adjudicator(mut self, adjudicator: Arc<dyn Adjudicator>, timeout: Duration) -> Self {
        self.adjudication = Some(Adjudication::new(
            adjudicator,
            self.settings.resolver.retry.clone(),
            timeout,
        ));
        self
    }

    #[must_use]
    /// The settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves one unnamed document.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the headings cannot form an outline.
    pub fn run(
        &self,
        headings: Vec<RawHeading>,
        raw_text: &str,
    ) -> Result<DocumentResult, StructuralError> {
        self.run_named("document", headings, raw_text)
    }

    /// Resolves many documents in parallel, returning results in input order.
    pub fn run_batch(
        &self,
        documents: &[DocumentInput],
    ) -> Vec<Result<DocumentResult, StructuralError>> {
        documents
            .par_iter()
            .map(|doc| self.run_named(&doc.name, doc.headings.clone(), &doc.raw_text))
            .collect()
    }

    /// Resolves one document, naming it in events and in the result.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the headings cannot form an outline.
    pub fn run_named(
        &self,
        name: &str,
        headings: Vec<RawHeading>,
        raw_text: &str,
    ) -> Result<DocumentResult, StructuralError> {
        let reporter: &dyn Reporter = self.reporter.as_ref();
        reporter.report(&Event::DocumentStarted {
            document: name.to_string(),
            nodes: headings.len(),
            text_len: raw_text.len(),
        });

        let claimed = loader::claimed_children(&headings);
        let records = loader::load(headings)?;
        let tree = hierarchy::build(records, &self.settings.root_title)?;
        let (mut tree, gap_warnings) = fill_gaps(tree, &self.settings.gaps)?;
        let mismatches = hierarchy::cross_check(&tree, &claimed);
        if mismatches > 0 {
            log::debug!("{name}: {mismatches} nodes had children that disagree with their levels");
        }

        let mut summary = Summary::default();
        let warn = |summary: &mut Summary, warning: Warning| {
            reporter.report(&Event::Warning {
                warning: warning.clone(),
            });
            summary.push_warning(warning);
        };
        for warning in gap_warnings {
            warn(&mut summary, warning);
        }

        let mut resolver = BoundaryResolver::new(raw_text, &self.settings.resolver, reporter)
            .with_adjudication(self.adjudication.as_ref());
        let resolved = resolver.resolve_tree(&tree);
        // Already reported by the resolver as they happened
        for warning in resolver.take_warnings() {
            summary.push_warning(warning);
        }

        let rules = self.settings.content_rules();
        classify(&mut tree, &resolved, raw_text, &rules, reporter);
        let materialized = materialize(&tree, &resolved, raw_text, &rules);
        for warning in materialized.warnings {
            warn(&mut summary, warning);
        }

        for (node, segment) in tree.iter().zip(&resolved) {
            if node.is_synthetic {
                summary.synthetic += 1;
            } else {
                summary.record_method(segment.method);
            }
        }
        debug_assert_eq!(
            summary.resolved() + summary.unresolved + summary.synthetic,
            tree.len()
        );
        summary.coverage_ratio = materialized.coverage_ratio;

        reporter.report(&Event::DocumentFinished {
            document: name.to_string(),
            summary: summary.clone(),
        });
        Ok(DocumentResult {
            document: name.to_string(),
            tree,
            segments: materialized.segments,
            unresolved: materialized.unresolved,
            summary,
        })
    }
}

impl DocumentResult {
    #[must_use]
    /// Segments produced by the given tier.
    pub fn segments_by(&self, method: Method) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.method == method).collect()
    }

    #[must_use]
    /// The segment of a node, if one was emitted.
    pub fn segment_for(&self, id: NodeId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.node_id == id)
    }
}

#[cfg(test)]
#[path = "tests/pipeline.rs"]
mod tests;
