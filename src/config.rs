//! Configuration to acknowledge user preferences as well as set defaults.
//!
//! Specifically, we try to find a tocmap.toml, and if present we load settings from there.
//! This provides matching thresholds, tier order, retry behaviour and input file preferences.

use crate::error::ConfigError;
use crate::gap::GapSettings;
use crate::hierarchy::DEFAULT_ROOT_TITLE;
use crate::matching::{MatchSettings, MatchTier};
use crate::pages::DEFAULT_PAGE_MARKER;
use crate::pipeline::Settings;
use crate::resolver::ResolverSettings;
use crate::retry::RetryPolicy;
use facet::Facet;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File looked for in the working directory.
pub const CONFIG_FILE: &str = "tocmap.toml";

#[derive(Facet, Clone, Debug)]
/// User preferences loaded from tocmap.toml or falling back to defaults.
pub struct Config {
    #[facet(default = 0.6)]
    /// Similarity ratio a fuzzy line must exceed to be accepted.
    pub fuzzy_threshold: f64,
    #[facet(default = vec!["exact".to_string(), "normalized".to_string(), "fuzzy".to_string()])]
    /// Matching tiers to try, in order.
    pub tiers: Vec<String>,
    #[facet(default = true)]
    /// Also match titles with their numbering removed.
    pub strip_numbering: bool,
    #[facet(default = true)]
    /// Only accept headings that begin a line.
    pub line_anchored: bool,
    #[facet(default = 5000)]
    /// Lines the fuzzy tier scores per window at most.
    pub fuzzy_line_limit: usize,
    #[facet(default = DEFAULT_PAGE_MARKER.to_string())]
    /// Regex for page marker lines; the first group is the page number.
    pub page_marker: String,
    #[facet(default = 1)]
    /// Largest level increase that is not a gap.
    pub max_level_step: usize,
    #[facet(default = false)]
    /// Add introductions where a first child starts on a later page than its parent.
    pub introduce_page_gaps: bool,
    #[facet(default = 1)]
    /// Non-whitespace characters a line needs to count as content.
    pub min_content_chars: usize,
    #[facet(default = 3)]
    /// Search windows per heading, and calls per adjudication.
    pub max_attempts: u32,
    #[facet(default = 200)]
    /// First retry delay in milliseconds.
    pub backoff_initial_ms: u64,
    #[facet(default = 2.0)]
    /// Delay and window growth per attempt.
    pub backoff_multiplier: f64,
    #[facet(default = 2000)]
    /// Longest retry delay in milliseconds.
    pub backoff_max_ms: u64,
    #[facet(default = 5000)]
    /// Per-call adjudicator timeout in milliseconds.
    pub adjudicator_timeout_ms: u64,
    #[facet(default = DEFAULT_ROOT_TITLE.to_string())]
    /// Title of the implicit root node.
    pub root_title: String,
    #[facet(default = vec!["txt".to_string(), "md".to_string()])]
    /// Extensions tried, in order, when looking for an index's raw text.
    pub text_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
            tiers: MatchTier::ALL.iter().map(|t| t.name().to_string()).collect(),
            strip_numbering: true,
            line_anchored: true,
            fuzzy_line_limit: 5000,
            page_marker: DEFAULT_PAGE_MARKER.to_string(),
            max_level_step: 1,
            introduce_page_gaps: false,
            min_content_chars: 1,
            max_attempts: 3,
            backoff_initial_ms: 200,
            backoff_multiplier: 2.0,
            backoff_max_ms: 2000,
            adjudicator_timeout_ms: 5000,
            root_title: DEFAULT_ROOT_TITLE.to_string(),
            text_extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

impl Config {
    #[must_use]
    /// Load configuration from tocmap.toml if present.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    #[must_use]
    /// Load configuration from `path`, falling back to defaults if it is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        Self::parse(&contents).unwrap_or_else(|| {
            log::warn!("ignoring malformed {}", path.display());
            Self::default()
        })
    }

    #[must_use]
    /// Parses TOML configuration text; absent keys take their defaults.
    pub fn parse(contents: &str) -> Option<Self> {
        facet_toml::from_str::<Self>(contents).ok()
    }

    /// Matching tiers named by `tiers`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name or an empty list.
    pub fn match_tiers(&self) -> Result<Vec<MatchTier>, ConfigError> {
        let tiers = self
            .tiers
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<MatchTier>, _>>()?;
        if tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }
        Ok(tiers)
    }

    #[must_use]
    /// Retry schedule for window widening and adjudicator calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_initial: Duration::from_millis(self.backoff_initial_ms),
            backoff_multiplier: self.backoff_multiplier,
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    #[must_use]
    /// Per-call adjudicator timeout.
    pub fn adjudicator_timeout(&self) -> Duration {
        Duration::from_millis(self.adjudicator_timeout_ms)
    }

    /// Typed resolver settings.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid page marker, unknown tier, or out-of-range threshold.
    pub fn resolver_settings(&self) -> Result<ResolverSettings, ConfigError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::Threshold(self.fuzzy_threshold));
        }
        Ok(ResolverSettings {
            tiers: self.match_tiers()?,
            matching: MatchSettings {
                fuzzy_threshold: self.fuzzy_threshold,
                strip_numbering: self.strip_numbering,
                line_anchored: self.line_anchored,
                fuzzy_line_limit: self.fuzzy_line_limit,
            },
            page_marker: Regex::new(&self.page_marker)?,
            retry: self.retry_policy(),
        })
    }

    /// Settings for the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolver settings are invalid.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings {
            root_title: self.root_title.clone(),
            gaps: GapSettings {
                max_level_step: self.max_level_step,
                introduce_page_gaps: self.introduce_page_gaps,
            },
            resolver: self.resolver_settings()?,
            min_content_chars: self.min_content_chars,
        })
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
