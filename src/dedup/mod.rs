// src/dedup/mod.rs
//! The duplicate intervention remover: groups records by normalized exact
//! name and by fuzzy word-overlap, keeps the richest copy of each group, and
//! deletes the rest.

pub mod db;
pub mod similarity;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use crate::config::DedupConfig;
use crate::models::{DedupRunStats, Intervention};
use crate::utils::db_connect::PgPool;
use crate::utils::progress_config::ProgressConfig;

#[derive(Debug, Clone)]
pub enum DuplicateKind {
    ExactName,
    SimilarName { similarity: f64 },
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKind::ExactName => write!(f, "exact name"),
            DuplicateKind::SimilarName { similarity } => {
                write!(f, "name similarity {:.1}%", similarity * 100.0)
            }
        }
    }
}

/// One resolved duplicate group: the record to keep and the records queued
/// for deletion.
#[derive(Debug, Clone)]
pub struct DuplicateEntry {
    pub kind: DuplicateKind,
    pub keep_id: String,
    pub keep_name: String,
    pub remove_ids: Vec<String>,
}

/// The outcome of the planning pass, before anything touches the store.
#[derive(Debug, Default)]
pub struct DedupPlan {
    pub entries: Vec<DuplicateEntry>,
    pub exact_groups: usize,
    pub fuzzy_pairs: usize,
    pub candidate_pairs_evaluated: usize,
    pub entries_truncated_by_cap: usize,
    /// Deletion queue in entry order, first occurrence wins.
    pub ids_to_delete: Vec<String>,
}

/// Plans duplicate groups over an in-memory intervention list.
///
/// Exact groups come first (keep the longest description, stable on load
/// order), then fuzzy pairs found through prefix blocking (keep whichever of
/// the two has the longer description). The processing cap, when set,
/// truncates the combined entry list and reports how much was dropped.
pub fn plan_duplicates(interventions: &[Intervention], config: &DedupConfig) -> DedupPlan {
    let mut plan = DedupPlan::default();

    let normalized: Vec<String> = interventions
        .iter()
        .map(|i| similarity::normalize_name(i.name.as_deref().unwrap_or_default()))
        .collect();
    let words: Vec<Vec<String>> = normalized
        .iter()
        .map(|n| similarity::significant_words(n))
        .collect();

    // Exact duplicates, grouped by normalized name in first-seen order.
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut group_order: Vec<&str> = Vec::new();
    for (idx, name) in normalized.iter().enumerate() {
        if name.is_empty() {
            continue;
        }
        let members = groups.entry(name.as_str()).or_default();
        if members.is_empty() {
            group_order.push(name.as_str());
        }
        members.push(idx);
    }

    let mut entries = Vec::new();
    for name in &group_order {
        let members = &groups[*name];
        if members.len() < 2 {
            continue;
        }
        plan.exact_groups += 1;
        // Stable sort keeps load order between equal description lengths.
        let mut ranked = members.clone();
        ranked.sort_by_key(|&idx| std::cmp::Reverse(interventions[idx].description_len()));
        let keep = ranked[0];
        entries.push(DuplicateEntry {
            kind: DuplicateKind::ExactName,
            keep_id: interventions[keep].id.clone(),
            keep_name: interventions[keep].name.clone().unwrap_or_default(),
            remove_ids: ranked[1..]
                .iter()
                .map(|&idx| interventions[idx].id.clone())
                .collect(),
        });
    }

    // Fuzzy duplicates: prefix blocking instead of the all-pairs scan.
    let mut block_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, name) in normalized.iter().enumerate() {
        if name.is_empty() {
            continue;
        }
        for key in similarity::block_keys(name) {
            block_index.entry(key).or_default().push(idx);
        }
    }

    let mut seen_pairs: HashSet<(usize, usize)> = HashSet::new();
    for idx1 in 0..interventions.len() {
        if normalized[idx1].is_empty() {
            continue;
        }
        let mut partners: Vec<usize> = Vec::new();
        for key in similarity::block_keys(&normalized[idx1]) {
            if let Some(bucket) = block_index.get(&key) {
                partners.extend(bucket.iter().copied().filter(|&idx2| idx2 > idx1));
            }
        }
        partners.sort_unstable();
        partners.dedup();

        for idx2 in partners {
            if !seen_pairs.insert((idx1, idx2)) {
                continue;
            }
            // Identical normalized names already belong to an exact group.
            if normalized[idx1] == normalized[idx2] {
                continue;
            }
            plan.candidate_pairs_evaluated += 1;
            let score = similarity::jaccard_over_words(&words[idx1], &words[idx2]);
            if score < config.similarity_threshold {
                continue;
            }
            plan.fuzzy_pairs += 1;
            let (keep, remove) =
                if interventions[idx2].description_len() > interventions[idx1].description_len() {
                    (idx2, idx1)
                } else {
                    (idx1, idx2)
                };
            entries.push(DuplicateEntry {
                kind: DuplicateKind::SimilarName { similarity: score },
                keep_id: interventions[keep].id.clone(),
                keep_name: interventions[keep].name.clone().unwrap_or_default(),
                remove_ids: vec![interventions[remove].id.clone()],
            });
        }
    }

    if let Some(cap) = config.max_entries {
        if entries.len() > cap {
            plan.entries_truncated_by_cap = entries.len() - cap;
            entries.truncate(cap);
        }
    }

    let mut queued: HashSet<String> = HashSet::new();
    for entry in &entries {
        for id in &entry.remove_ids {
            if queued.insert(id.clone()) {
                plan.ids_to_delete.push(id.clone());
            }
        }
    }

    plan.entries = entries;
    plan
}

/// Runs the full deduplication pass. Each deletion is attempted
/// independently; failures are logged, counted, and skipped with no
/// rollback.
pub async fn run_intervention_dedup(
    pool: &PgPool,
    config: &DedupConfig,
    progress: &ProgressConfig,
    run_id: &str,
    dry_run: bool,
) -> Result<DedupRunStats> {
    let mut stats = DedupRunStats::new(run_id, Utc::now().naive_utc());
    let start = Instant::now();

    info!("Phase 1: Loading interventions");
    let conn = pool
        .get()
        .await
        .context("Dedup: failed to get DB connection")?;
    let interventions = crate::matching::db::fetch_all_interventions(&*conn).await?;
    drop(conn);
    stats.interventions_total = interventions.len();
    info!("Loaded {} intervention records", stats.interventions_total);

    info!("Phase 2: Planning duplicate groups");
    let plan = plan_duplicates(&interventions, config);
    stats.exact_groups = plan.exact_groups;
    stats.fuzzy_pairs = plan.fuzzy_pairs;
    stats.candidate_pairs_evaluated = plan.candidate_pairs_evaluated;
    stats.entries_truncated_by_cap = plan.entries_truncated_by_cap;
    stats.deletions_planned = plan.ids_to_delete.len();

    info!(
        "Found {} exact groups and {} fuzzy pairs ({} candidate pairs evaluated)",
        plan.exact_groups, plan.fuzzy_pairs, plan.candidate_pairs_evaluated
    );
    if plan.entries_truncated_by_cap > 0 {
        warn!(
            "Processing cap dropped {} duplicate entries this run",
            plan.entries_truncated_by_cap
        );
    }

    for entry in &plan.entries {
        info!(
            "[{}] keeping {} \"{}\", removing {:?}",
            entry.kind, entry.keep_id, entry.keep_name, entry.remove_ids
        );
    }

    if dry_run {
        info!(
            "[dry-run] Would delete {} duplicate interventions",
            plan.ids_to_delete.len()
        );
        stats.dedup_time = start.elapsed().as_secs_f64();
        return Ok(stats);
    }

    info!(
        "Phase 3: Deleting {} duplicate records",
        plan.ids_to_delete.len()
    );
    let pb = progress.create_bar(
        plan.ids_to_delete.len() as u64,
        "  🧹 [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} Deleting duplicates...",
    );

    for id in &plan.ids_to_delete {
        pb.inc(1);
        match db::delete_intervention(pool, id).await {
            Ok(true) => stats.deletions_applied += 1,
            Ok(false) => warn!("Dedup: intervention {} was already gone", id),
            Err(e) => {
                warn!("Dedup: failed to delete intervention {}: {}", id, e);
                stats.individual_operation_errors += 1;
            }
        }
    }
    pb.finish_with_message(format!("{} duplicates deleted", stats.deletions_applied));

    stats.dedup_time = start.elapsed().as_secs_f64();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervention(id: &str, name: &str, description: &str) -> Intervention {
        Intervention {
            id: id.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            operating_organization: None,
            geography: Vec::new(),
            intervention_type: None,
        }
    }

    fn default_config() -> DedupConfig {
        DedupConfig {
            similarity_threshold: similarity::DEFAULT_SIMILARITY_THRESHOLD,
            max_entries: None,
        }
    }

    #[test]
    fn test_exact_group_keeps_longest_description() {
        let records = vec![
            intervention("int-1", "Youth Koori Court", "short"),
            intervention("int-2", "Youth Koori Court", "a much longer description of the court"),
            intervention("int-3", "Youth Koori Court!", "medium length text"),
        ];
        let plan = plan_duplicates(&records, &default_config());

        assert_eq!(plan.exact_groups, 1);
        let entry = &plan.entries[0];
        assert_eq!(entry.keep_id, "int-2");
        assert!(entry.remove_ids.contains(&"int-1".to_string()));
        assert!(entry.remove_ids.contains(&"int-3".to_string()));

        // Retention rule: kept description is at least as long as every
        // deleted one in the group.
        let keep_len = records[1].description_len();
        for id in &entry.remove_ids {
            let removed = records.iter().find(|r| &r.id == id).unwrap();
            assert!(keep_len >= removed.description_len());
        }
    }

    #[test]
    fn test_exact_tie_keeps_first_loaded() {
        let records = vec![
            intervention("int-1", "BackTrack", "same length!"),
            intervention("int-2", "BackTrack", "same length?"),
        ];
        let plan = plan_duplicates(&records, &default_config());
        assert_eq!(plan.entries[0].keep_id, "int-1");
        assert_eq!(plan.entries[0].remove_ids, vec!["int-2".to_string()]);
    }

    #[test]
    fn test_fuzzy_pair_keeps_longer_description() {
        let records = vec![
            intervention("int-1", "Youth Mentoring Program", "short"),
            intervention(
                "int-2",
                "Youth Mentoring Programme",
                "a richer description of the mentoring offer",
            ),
        ];
        let plan = plan_duplicates(&records, &default_config());

        assert_eq!(plan.exact_groups, 0);
        assert_eq!(plan.fuzzy_pairs, 1);
        let entry = &plan.entries[0];
        assert!(matches!(entry.kind, DuplicateKind::SimilarName { .. }));
        assert_eq!(entry.keep_id, "int-2");
        assert_eq!(entry.remove_ids, vec!["int-1".to_string()]);
        assert_eq!(plan.ids_to_delete, vec!["int-1".to_string()]);
    }

    #[test]
    fn test_reordered_words_are_flagged() {
        let records = vec![
            intervention("int-1", "Youth Mentoring Program", "longer description"),
            intervention("int-2", "Mentoring Youth Program", "short"),
        ];
        let plan = plan_duplicates(&records, &default_config());
        assert_eq!(plan.fuzzy_pairs, 1);
        assert_eq!(plan.entries[0].keep_id, "int-1");
    }

    #[test]
    fn test_distinct_programs_are_not_flagged() {
        let records = vec![
            intervention("int-1", "Youth Justice Program", "one"),
            intervention("int-2", "Youth Housing Program", "two"),
            intervention("int-3", "Adult Literacy Service", "three"),
        ];
        let plan = plan_duplicates(&records, &default_config());
        assert!(plan.entries.is_empty());
        assert!(plan.ids_to_delete.is_empty());
        // Blocking still put the two "Youth ... Program" names in front of
        // the similarity check.
        assert!(plan.candidate_pairs_evaluated >= 1);
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let mut record = intervention("int-1", "", "text");
        record.name = None;
        let records = vec![
            record,
            intervention("int-2", "!!!", "text"),
            intervention("int-3", "Real Program", "text"),
        ];
        let plan = plan_duplicates(&records, &default_config());
        assert!(plan.entries.is_empty());
    }

    #[test]
    fn test_cap_truncates_entries_and_reports_dropped() {
        let records = vec![
            intervention("int-1", "Program One", "long description"),
            intervention("int-2", "Program One", "short"),
            intervention("int-3", "Program Two", "long description"),
            intervention("int-4", "Program Two", "short"),
            intervention("int-5", "Program Three", "long description"),
            intervention("int-6", "Program Three", "short"),
        ];
        let config = DedupConfig {
            max_entries: Some(1),
            ..default_config()
        };
        let plan = plan_duplicates(&records, &config);
        assert_eq!(plan.entries.len(), 1);
        assert!(plan.entries_truncated_by_cap >= 2);
        assert_eq!(plan.ids_to_delete.len(), 1);
    }

    #[test]
    fn test_deletion_queue_has_no_repeats() {
        // int-2 is removable through its exact group and through a fuzzy
        // pair with int-3; it must be queued once.
        let records = vec![
            intervention("int-1", "Night Patrol Service", "the richest description by far"),
            intervention("int-2", "Night Patrol Service", "short"),
            intervention("int-3", "Night Patrol Services", "a medium description"),
        ];
        let plan = plan_duplicates(&records, &default_config());
        let mut sorted = plan.ids_to_delete.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), plan.ids_to_delete.len());
    }
}
