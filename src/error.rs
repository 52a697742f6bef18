//! Error types for loading and resolving an outline.
//!
//! Only [`StructuralError`] aborts a document. Everything else the pipeline encounters degrades
//! into a [`Warning`](crate::report::Warning) collected in the document summary.

use crate::node::NodeId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Malformed outline input; fatal for the document being processed.
pub enum StructuralError {
    #[error("node index is empty")]
    /// No headings were supplied.
    EmptyIndex,

    #[error("duplicate node id {id}")]
    /// Two headings share an identifier.
    DuplicateId {
        /// The repeated identifier.
        id: NodeId,
    },

    #[error("node {id} has an empty title")]
    /// A heading has no text to search for.
    EmptyTitle {
        /// Offending node.
        id: NodeId,
    },

    #[error("node {id} has an inverted {kind} hint ({start} > {end})")]
    /// A hint's end precedes its start.
    InvertedHint {
        /// Offending node.
        id: NodeId,
        /// Which hint was inverted (`page` or `offset`).
        kind: &'static str,
        /// Hinted start.
        start: usize,
        /// Hinted end.
        end: usize,
    },

    #[error("node {child} starts before its parent {parent} ({child_start} < {parent_start})")]
    /// A child's location hint precedes its parent's, so no gap span can be derived.
    NonMonotonicHints {
        /// Containing node.
        parent: NodeId,
        /// Nested node.
        child: NodeId,
        /// Parent's hinted start.
        parent_start: usize,
        /// Child's hinted start.
        child_start: usize,
    },

    #[error("node {child} (level {child_level}) is not deeper than its parent {parent} (level {parent_level})")]
    /// The tree violates the parent-shallower-than-child invariant.
    LevelInvariant {
        /// Containing node.
        parent: NodeId,
        /// Its level.
        parent_level: usize,
        /// Nested node.
        child: NodeId,
        /// Its level.
        child_level: usize,
    },
}

#[derive(Debug, Error)]
/// Failure to read a heading index in one of the supported formats.
pub enum LoadError {
    #[error("failed to read input: {0}")]
    /// The index or text file could not be read.
    Io(#[from] std::io::Error),

    #[error("failed to decode JSON node index: {0}")]
    /// The JSON index could not be deserialised.
    Json(#[from] serde_json::Error),

    #[error("failed to load tree-sitter grammar: {0}")]
    /// The grammar is incompatible with the linked tree-sitter runtime.
    Language(#[from] tree_sitter::LanguageError),

    #[error("invalid tree-sitter query: {0}")]
    /// A format's query does not compile against its grammar.
    Query(#[from] tree_sitter::QueryError),

    #[error("tree-sitter produced no syntax tree")]
    /// The parser gave up (cancelled or timed out).
    Parse,

    #[error("heading marker {0:?} is not an ATX marker")]
    /// A heading node carried an unexpected marker kind.
    Marker(String),

    #[error(transparent)]
    /// The loaded headings did not form a valid outline.
    Structure(#[from] StructuralError),
}

#[derive(Debug, Error)]
/// Configuration values that cannot be turned into pipeline settings.
pub enum ConfigError {
    #[error("invalid page marker pattern: {0}")]
    /// The page marker is not a valid regular expression.
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    /// A tier name is not recognised.
    Tier(#[from] crate::matching::UnknownTier),

    #[error("at least one matching tier must be enabled")]
    /// The tier list is empty.
    NoTiers,

    #[error("fuzzy threshold {0} is outside 0.0..=1.0")]
    /// The fuzzy acceptance threshold is not a ratio.
    Threshold(f64),
}
