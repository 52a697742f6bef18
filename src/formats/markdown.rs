//! Markdown outline format implementation using tree-sitter-md.
//!
//! A table of contents written as Markdown, one ATX heading per entry. `#` is level 0, `##`
//! level 1 and so on. A trailing page annotation such as `(p. 12)` or `(pp. 12-15)` becomes the
//! node's page hints and is stripped from the title.

use crate::error::LoadError;
use crate::formats::Format;
use crate::node::{Hints, RawHeading};
use once_cell::sync::Lazy;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Query, QueryCursor};

static PAGE_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\((?:pp?\.?|pages?)\s*(\d+)(?:\s*[-–—]\s*(\d+))?\)\s*$")
        .expect("page annotation pattern is valid")
});

/// Tree-sitter queries for ATX-style markdown headings (# syntax).
pub struct MarkdownOutline;

impl MarkdownOutline {
    fn language(&self) -> tree_sitter::Language {
        tree_sitter_md::LANGUAGE.into()
    }

    fn section_query(&self) -> &'static str {
        "(atx_heading) @heading"
    }
}

impl Format for MarkdownOutline {
    fn file_suffix(&self) -> &'static str {
        ".toc.md"
    }

    fn parse_index(&self, source: &str) -> Result<Vec<RawHeading>, LoadError> {
        let language = self.language();
        let mut parser = Parser::new();
        parser.set_language(&language)?;
        let tree = parser.parse(source, None).ok_or(LoadError::Parse)?;

        let query = Query::new(&language, self.section_query())?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

        let mut headings = Vec::new();
        let mut next_id = 1u32;

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let mut level = None;
                let mut text = "";

                let mut walker = node.walk();
                for child in node.children(&mut walker) {
                    let kind = child.kind();
                    if let Some(digit) = kind
                        .strip_prefix("atx_h")
                        .and_then(|rest| rest.strip_suffix("_marker"))
                    {
                        let depth: usize = digit
                            .parse()
                            .map_err(|_| LoadError::Marker(kind.to_string()))?;
                        level = Some(depth.saturating_sub(1));
                    } else if kind == "inline" {
                        text = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    }
                }

                let Some(level) = level else { continue };
                let (title, hints) = split_page_annotation(text.trim());
                if title.is_empty() {
                    continue;
                }

                headings.push(RawHeading {
                    id: next_id,
                    title,
                    level,
                    hints,
                    children_ids: None,
                });
                next_id += 1;
            }
        }

        Ok(headings)
    }
}

fn split_page_annotation(text: &str) -> (String, Hints) {
    let mut hints = Hints::default();
    let Some(caps) = PAGE_ANNOTATION.captures(text) else {
        return (text.to_string(), hints);
    };
    hints.start_page = caps.get(1).and_then(|m| m.as_str().parse().ok());
    hints.end_page = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .or(hints.start_page);
    let title = text[..caps.get(0).map_or(text.len(), |m| m.start())]
        .trim()
        .to_string();
    (title, hints)
}

#[cfg(test)]
#[path = "../tests/formats_markdown.rs"]
mod tests;
