//! Deciding which non-leaf nodes own text.
//!
//! A chapter heading is often followed directly by its first section, in which case the chapter has
//! no text of its own and should not produce a segment. When prose sits between the chapter heading
//! and the first child heading, the chapter owns it. Extraction artefacts such as page markers and
//! bare page numbers do not count as prose.

use crate::report::{Event, Reporter};
use crate::segment::Segment;
use crate::tree::NodeTree;
use regex::Regex;

#[derive(Clone, Debug)]
/// What counts as content.
pub struct ContentRules {
    /// Non-whitespace characters a line needs to count as content.
    pub min_content_chars: usize,
    /// Page marker lines, which never count.
    pub page_marker: Regex,
}

impl ContentRules {
    #[must_use]
    /// Whether a single line is an artefact or too short to be content.
    pub fn is_blank_line(&self, line: &str) -> bool {
        let line = line.trim();
        line.is_empty()
            || line.chars().filter(|c| !c.is_whitespace()).count() < self.min_content_chars.max(1)
            || line.chars().all(|c| c.is_ascii_digit())
            || self.page_marker.is_match(line)
    }

    #[must_use]
    /// Whether `text` holds at least one content line.
    pub fn owns_text(&self, text: &str) -> bool {
        text.lines().any(|line| !self.is_blank_line(line))
    }
}

/// Sets `has_content` on every node.
///
/// Leaves always own their text. A non-leaf owns whatever lies between the end of its heading and
/// the heading of the node after it; an unresolved non-leaf owns nothing.
pub fn classify(
    tree: &mut NodeTree,
    segments: &[Segment],
    raw_text: &str,
    rules: &ContentRules,
    reporter: &dyn Reporter,
) {
    for (position, node) in tree.nodes_mut().iter_mut().enumerate() {
        if node.is_leaf() {
            node.has_content = true;
            continue;
        }
        let has_content = segments.get(position).is_some_and(|segment| {
            if !segment.is_resolved() {
                return false;
            }
            let until = segments
                .get(position + 1)
                .filter(|next| next.is_resolved())
                .map_or(segment.end_offset, |next| next.heading_offset)
                .max(segment.start_offset);
            raw_text
                .get(segment.start_offset..until)
                .is_some_and(|text| rules.owns_text(text))
        });
        node.has_content = has_content;
        reporter.report(&Event::ContentClassified {
            node_id: node.id,
            has_content,
        });
    }
}

#[cfg(test)]
#[path = "tests/classifier.rs"]
mod tests;
