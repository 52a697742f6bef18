//! JSON node array format.
//!
//! The array form `[{"id": 1, "title": "...", "level": 0, "start_page": 3}, ...]` is what the
//! extraction tooling emits. A `{"nodes": [...]}` wrapper object is accepted too.

use crate::error::LoadError;
use crate::formats::Format;
use crate::node::RawHeading;
use serde::Deserialize;

/// Plain JSON array of heading records.
pub struct JsonIndex;

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Bare(Vec<RawHeading>),
    Wrapped { nodes: Vec<RawHeading> },
}

impl Format for JsonIndex {
    fn file_suffix(&self) -> &'static str {
        ".nodes.json"
    }

    fn parse_index(&self, source: &str) -> Result<Vec<RawHeading>, LoadError> {
        let envelope: Envelope = serde_json::from_str(source)?;
        Ok(match envelope {
            Envelope::Bare(nodes) | Envelope::Wrapped { nodes } => nodes,
        })
    }
}

#[cfg(test)]
#[path = "../tests/formats_json.rs"]
mod tests;
