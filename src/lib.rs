//! tocmap: resolve a table of contents against extracted document text.
//!
//! Given the headings of a document (title, nesting level, optional page or offset hints) and the
//! raw text an extractor produced for it, tocmap rebuilds the outline, fills holes in it, and finds
//! the exact byte span of every section's content. Headings are located with exact, normalised and
//! fuzzy matching in turn, each result carrying the tier that found it and a confidence score.
//!
//! The [`pipeline::Pipeline`] runs every stage; each stage is also usable on its own.
#![allow(clippy::multiple_crate_versions)]

pub mod adjudicator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod formats;
pub mod gap;
pub mod hierarchy;
pub mod input;
pub mod loader;
pub mod matching;
pub mod materializer;
pub mod node;
pub mod normalize;
pub mod pages;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod segment;
pub mod tree;

pub use error::{LoadError, StructuralError};
pub use node::{NodeId, NodeRecord, RawHeading};
pub use pipeline::{DocumentInput, DocumentResult, Pipeline, Settings};
pub use segment::{Method, Segment};
