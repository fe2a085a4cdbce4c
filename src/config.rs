// src/config.rs
//! Run configuration for the two batch jobs.
//!
//! Both jobs take an explicit immutable config struct built from environment
//! variables and optionally overridden by CLI flags, so the scoring and
//! planning routines stay pure and testable.

use log::info;
use std::env;

/// Configuration for the evidence-intervention matcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Minimum combined rule score for a candidate to be linkable.
    pub score_threshold: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            score_threshold: crate::matching::rules::DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl MatcherConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            score_threshold: env::var("MATCH_SCORE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(default.score_threshold),
        }
    }

    pub fn with_threshold_override(mut self, threshold: Option<u32>) -> Self {
        if let Some(t) = threshold {
            self.score_threshold = t;
        }
        self
    }

    pub fn log_config(&self) {
        info!("Matcher config: score_threshold={}", self.score_threshold);
    }
}

/// Configuration for the duplicate intervention remover.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Minimum Jaccard similarity for a fuzzy duplicate pair.
    pub similarity_threshold: f64,
    /// Cap on processed duplicate entries (exact groups + fuzzy pairs
    /// combined). `None` means unlimited. The original tooling silently
    /// truncated to 20; here the cap is explicit and off by default.
    pub max_entries: Option<usize>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: crate::dedup::similarity::DEFAULT_SIMILARITY_THRESHOLD,
            max_entries: None,
        }
    }
}

impl DedupConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            similarity_threshold: env::var("DEDUP_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(default.similarity_threshold),
            max_entries: env::var("DEDUP_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok()),
        }
    }

    pub fn with_overrides(
        mut self,
        similarity_threshold: Option<f64>,
        max_entries: Option<usize>,
    ) -> Self {
        if let Some(t) = similarity_threshold {
            self.similarity_threshold = t;
        }
        if max_entries.is_some() {
            self.max_entries = max_entries;
        }
        self
    }

    pub fn log_config(&self) {
        match self.max_entries {
            Some(cap) => info!(
                "Dedup config: similarity_threshold={}, max_entries={}",
                self.similarity_threshold, cap
            ),
            None => info!(
                "Dedup config: similarity_threshold={}, max_entries=unlimited",
                self.similarity_threshold
            ),
        }
    }
}
