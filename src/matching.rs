//! Matching tiers for locating a heading in raw text.
//!
//! Each tier answers the same question, "where in this window does this title appear as a
//! heading?", with increasing tolerance and cost:
//!
//! - [`MatchTier::Exact`] looks for the title literally, then for the title without its numbering.
//! - [`MatchTier::Normalized`] compares lowercase alphanumeric word sequences, so punctuation,
//!   case and renumbering no longer matter.
//! - [`MatchTier::Fuzzy`] scores every line by similarity ratio and keeps the best line above the
//!   acceptance threshold, which absorbs OCR noise and small edits.
//!
//! A tier returns all qualifying candidates; choosing among them is left to the resolver.

use crate::normalize::{
    heading_marks_len, normalize_title, numbering_prefix_len, strip_numbering, NormalizedText,
};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Scores closer than this are considered tied.
pub const TIE_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// One matching strategy.
pub enum MatchTier {
    /// Literal substring search.
    Exact,
    /// Search over normalised copies with an offset map back.
    Normalized,
    /// Best line by similarity ratio.
    Fuzzy,
}

impl MatchTier {
    /// All tiers, cheapest first.
    pub const ALL: [Self; 3] = [Self::Exact, Self::Normalized, Self::Fuzzy];

    #[must_use]
    /// Configuration name of the tier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
        }
    }

    #[must_use]
    /// How far a perfect match by this tier is trusted.
    pub fn weight(self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::Normalized => 0.9,
            Self::Fuzzy => 0.8,
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown matching tier {0:?} (expected exact, normalized or fuzzy)")]
/// A tier name that is not one of [`MatchTier::ALL`].
pub struct UnknownTier(pub String);

impl FromStr for MatchTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// A located heading candidate.
pub struct MatchResult {
    /// Byte offset where the heading text begins.
    pub position: usize,
    /// Byte offset just past the heading text.
    pub end: usize,
    /// Similarity in `0.0..=1.0`; always 1 for exact and normalised hits.
    pub score: f64,
    /// Tier that produced it.
    pub tier: MatchTier,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Knobs shared by all tiers.
pub struct MatchSettings {
    /// Minimum similarity ratio a fuzzy line must exceed.
    pub fuzzy_threshold: f64,
    /// Also try titles with their numbering prefix removed.
    pub strip_numbering: bool,
    /// Only accept candidates that begin a line (after whitespace, `#` marks or numbering).
    pub line_anchored: bool,
    /// Maximum number of lines the fuzzy tier scores per window.
    pub fuzzy_line_limit: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            strip_numbering: true,
            line_anchored: true,
            fuzzy_line_limit: 5000,
        }
    }
}

#[must_use]
/// Similarity ratio `2·M / T` of two strings compared character by character.
pub fn similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

pub(crate) fn as_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

/// Largest ratio two strings of these lengths could reach.
fn ratio_bound(a: usize, b: usize) -> f64 {
    2.0 * as_f64(a.min(b)) / as_f64(a + b)
}

#[must_use]
/// Largest char boundary at or before `index`.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Start of the line holding `position` when only whitespace, `#` marks or a numbering prefix
/// come before it on that line.
fn heading_prefix_start(raw: &str, position: usize) -> Option<usize> {
    let line_start = raw[..position].rfind('\n').map_or(0, |i| i + 1);
    let line_end = raw[line_start..].find('\n').map_or(raw.len(), |i| line_start + i);
    let line = &raw[line_start..line_end];
    let offset = position - line_start;
    let marks = heading_marks_len(line);
    if offset <= marks {
        return Some(line_start);
    }
    let numbered = marks + numbering_prefix_len(&line[marks..]);
    (offset == numbered).then_some(line_start)
}

fn starts_line(raw: &str, position: usize) -> bool {
    heading_prefix_start(raw, position).is_some()
}

#[must_use]
/// Start of the heading line containing `position`, taking in any leading `#` marks and
/// numbering prefix.
///
/// Positions preceded by other text on their line are returned unchanged.
pub fn heading_line_start(raw: &str, position: usize) -> usize {
    let position = floor_char_boundary(raw, position);
    heading_prefix_start(raw, position).unwrap_or(position)
}

/// Runs matching tiers against one raw text.
pub struct Matcher<'t> {
    raw: &'t str,
    settings: MatchSettings,
    normalized: OnceCell<NormalizedText>,
}

impl<'t> Matcher<'t> {
    #[must_use]
    /// Prepares matching over `raw`. Normalisation is deferred until a normalised search needs it.
    pub fn new(raw: &'t str, settings: MatchSettings) -> Self {
        Self {
            raw,
            settings,
            normalized: OnceCell::new(),
        }
    }

    #[must_use]
    /// The text being searched.
    pub fn raw(&self) -> &'t str {
        self.raw
    }

    #[must_use]
    /// The settings in use.
    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    #[must_use]
    /// All candidates `tier` finds for `title` within `window`, in document order.
    ///
    /// The window is clamped to the text and snapped to char boundaries.
    pub fn find(&self, tier: MatchTier, title: &str, window: Range<usize>) -> Vec<MatchResult> {
        let start = floor_char_boundary(self.raw, window.start);
        let end = floor_char_boundary(self.raw, window.end).max(start);
        let window = start..end;
        match tier {
            MatchTier::Exact => self.exact(title, window),
            MatchTier::Normalized => self.normalized(title, window),
            MatchTier::Fuzzy => self.fuzzy(title, window),
        }
    }

    fn exact(&self, title: &str, window: Range<usize>) -> Vec<MatchResult> {
        let haystack = &self.raw[window.clone()];
        let mut needles = vec![title];
        if self.settings.strip_numbering {
            let bare = strip_numbering(title);
            if !bare.is_empty() && bare != title {
                needles.push(bare);
            }
        }
        for needle in needles.into_iter().filter(|n| !n.is_empty()) {
            let hits: Vec<_> = haystack
                .match_indices(needle)
                .map(|(i, _)| window.start + i)
                .filter(|&position| !self.settings.line_anchored || starts_line(self.raw, position))
                .map(|position| MatchResult {
                    position,
                    end: position + needle.len(),
                    score: 1.0,
                    tier: MatchTier::Exact,
                })
                .collect();
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }

    fn normalized(&self, title: &str, window: Range<usize>) -> Vec<MatchResult> {
        let needle = normalize_title(title, self.settings.strip_numbering);
        if needle.is_empty() {
            return Vec::new();
        }
        let text = self
            .normalized
            .get_or_init(|| NormalizedText::new(self.raw, self.settings.strip_numbering));
        text.find_all(&needle, window.start, window.end, self.settings.line_anchored)
            .map(|(position, end)| MatchResult {
                position,
                end,
                score: 1.0,
                tier: MatchTier::Normalized,
            })
            .collect()
    }

    /// Best-scoring lines, all of them when several tie.
    fn fuzzy(&self, title: &str, window: Range<usize>) -> Vec<MatchResult> {
        let needle = normalize_title(title, self.settings.strip_numbering);
        let needle_chars = needle.chars().count();
        if needle_chars == 0 {
            return Vec::new();
        }
        let threshold = self.settings.fuzzy_threshold;
        let mut best: Vec<MatchResult> = Vec::new();
        let mut best_score = threshold;
        let mut line_start = window.start;

        for line in self.raw[window]
            .split_inclusive('\n')
            .take(self.settings.fuzzy_line_limit)
        {
            let position = line_start;
            line_start += line.len();

            let content = line.trim_end();
            let lead = heading_marks_len(content);
            let body = &content[lead..];
            if body.is_empty() {
                continue;
            }
            let candidate = normalize_title(body, self.settings.strip_numbering);
            let candidate_chars = candidate.chars().count();
            if candidate_chars == 0 {
                continue;
            }
            let bound = ratio_bound(needle_chars, candidate_chars);
            if bound <= threshold || bound < best_score - TIE_EPSILON {
                continue;
            }

            let score = similarity(&needle, &candidate);
            if score <= threshold {
                continue;
            }
            let hit = MatchResult {
                position: position + lead,
                end: position + content.len(),
                score,
                tier: MatchTier::Fuzzy,
            };
            if best.is_empty() || score > best_score + TIE_EPSILON {
                best_score = score;
                best = vec![hit];
            } else if (score - best_score).abs() <= TIE_EPSILON {
                best.push(hit);
            }
        }
        best
    }
}

#[cfg(test)]
#[path = "tests/matching.rs"]
mod tests;
