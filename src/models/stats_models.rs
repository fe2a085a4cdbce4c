// src/models/stats_models.rs

use chrono::NaiveDateTime;
use serde::Serialize;

/// Tallies accumulated over one run of the evidence linker.
///
/// A run that hit individual insert errors still finishes and exits zero;
/// these counts are the caller's signal for how clean the run was.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRunStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub evidence_total: usize,
    pub interventions_total: usize,
    pub evidence_already_linked: usize,
    pub links_created: usize,
    pub links_skipped_conflict: usize,
    pub below_threshold: usize,
    pub individual_operation_errors: usize,
    pub confidence_scores_for_stats: Vec<u32>,
    pub matching_time: f64,
}

impl MatchRunStats {
    pub fn new(run_id: &str, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_timestamp,
            evidence_total: 0,
            interventions_total: 0,
            evidence_already_linked: 0,
            links_created: 0,
            links_skipped_conflict: 0,
            below_threshold: 0,
            individual_operation_errors: 0,
            confidence_scores_for_stats: Vec::new(),
            matching_time: 0.0,
        }
    }

    pub fn avg_match_score(&self) -> f64 {
        if self.confidence_scores_for_stats.is_empty() {
            return 0.0;
        }
        self.confidence_scores_for_stats.iter().map(|&s| s as f64).sum::<f64>()
            / self.confidence_scores_for_stats.len() as f64
    }
}

/// Tallies accumulated over one run of the intervention deduplicator.
#[derive(Debug, Clone, Serialize)]
pub struct DedupRunStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub interventions_total: usize,
    pub exact_groups: usize,
    pub fuzzy_pairs: usize,
    pub candidate_pairs_evaluated: usize,
    pub entries_truncated_by_cap: usize,
    pub deletions_planned: usize,
    pub deletions_applied: usize,
    pub individual_operation_errors: usize,
    pub dedup_time: f64,
}

impl DedupRunStats {
    pub fn new(run_id: &str, run_timestamp: NaiveDateTime) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_timestamp,
            interventions_total: 0,
            exact_groups: 0,
            fuzzy_pairs: 0,
            candidate_pairs_evaluated: 0,
            entries_truncated_by_cap: 0,
            deletions_planned: 0,
            deletions_applied: 0,
            individual_operation_errors: 0,
            dedup_time: 0.0,
        }
    }
}
