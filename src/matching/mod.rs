// src/matching/mod.rs
//! The evidence-intervention matcher: scores every unlinked evidence record
//! against every intervention and links the single best-scoring candidate
//! above the configured threshold.

pub mod db;
pub mod rules;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use std::time::Instant;

use crate::config::MatcherConfig;
use crate::models::{Evidence, Intervention, MatchRunStats, NewEvidenceLink};
use crate::utils::db_connect::PgPool;
use crate::utils::progress_config::ProgressConfig;

/// One retained intervention candidate for an evidence record.
pub struct MatchCandidate<'a> {
    pub intervention: &'a Intervention,
    pub score: u32,
    pub breakdown: Vec<(&'static str, u32)>,
}

/// Scores `evidence` against every intervention and returns the best
/// candidate at or above `score_threshold`.
///
/// Ties break to the first intervention encountered in iteration order
/// (strictly-greater comparison), matching first-match-wins ranking.
pub fn select_best_match<'a>(
    evidence: &Evidence,
    interventions: &'a [Intervention],
    score_threshold: u32,
) -> Option<MatchCandidate<'a>> {
    let mut best: Option<MatchCandidate<'a>> = None;
    for intervention in interventions {
        let (score, breakdown) = rules::score_pair_detailed(evidence, intervention);
        if score < score_threshold {
            continue;
        }
        if best.as_ref().map_or(true, |current| score > current.score) {
            best = Some(MatchCandidate {
                intervention,
                score,
                breakdown,
            });
        }
    }
    best
}

fn breakdown_json(candidate: &MatchCandidate<'_>) -> serde_json::Value {
    let rules: serde_json::Map<String, serde_json::Value> = candidate
        .breakdown
        .iter()
        .filter(|(_, points)| *points > 0)
        .map(|(name, points)| (name.to_string(), json!(points)))
        .collect();
    json!({ "total": candidate.score, "rules": rules })
}

/// Runs the full linking pass. Per-record insert failures are logged,
/// counted, and skipped; the loop always runs to completion.
pub async fn run_evidence_linking(
    pool: &PgPool,
    config: &MatcherConfig,
    progress: &ProgressConfig,
    run_id: &str,
    dry_run: bool,
) -> Result<MatchRunStats> {
    let mut stats = MatchRunStats::new(run_id, Utc::now().naive_utc());
    let start = Instant::now();

    info!("Phase 1: Loading evidence, interventions, and existing links");
    let conn = pool
        .get()
        .await
        .context("Matcher: failed to get DB connection")?;
    let evidence_list = db::fetch_all_evidence(&*conn).await?;
    let interventions = db::fetch_all_interventions(&*conn).await?;
    let linked_evidence_ids = db::fetch_linked_evidence_ids(&*conn).await?;
    drop(conn);

    stats.evidence_total = evidence_list.len();
    stats.interventions_total = interventions.len();
    info!(
        "Loaded {} evidence records, {} interventions, {} existing links",
        stats.evidence_total,
        stats.interventions_total,
        linked_evidence_ids.len()
    );

    info!("Phase 2: Scoring and linking");
    let pb = progress.create_bar(
        evidence_list.len() as u64,
        "  🔗 [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} Scoring evidence...",
    );

    for evidence in &evidence_list {
        pb.inc(1);

        if linked_evidence_ids.contains(&evidence.id) {
            stats.evidence_already_linked += 1;
            continue;
        }

        let candidate = match select_best_match(evidence, &interventions, config.score_threshold) {
            Some(candidate) => candidate,
            None => {
                stats.below_threshold += 1;
                continue;
            }
        };

        if progress.should_show_detailed() {
            pb.set_message(format!(
                "[{}] {} -> {}",
                candidate.score,
                evidence.title.as_deref().unwrap_or("(untitled)"),
                candidate.intervention.name.as_deref().unwrap_or("(unnamed)")
            ));
        }

        if dry_run {
            info!(
                "[dry-run] Would link evidence {} -> intervention {} (score {})",
                evidence.id, candidate.intervention.id, candidate.score
            );
            stats.links_created += 1;
            stats.confidence_scores_for_stats.push(candidate.score);
            continue;
        }

        let link = NewEvidenceLink {
            intervention_id: candidate.intervention.id.clone(),
            evidence_id: evidence.id.clone(),
            match_score: candidate.score as i32,
            match_details: breakdown_json(&candidate),
        };

        match db::insert_evidence_link(pool, &link).await {
            Ok(true) => {
                stats.links_created += 1;
                stats.confidence_scores_for_stats.push(candidate.score);
            }
            Ok(false) => {
                stats.links_skipped_conflict += 1;
            }
            Err(e) => {
                warn!(
                    "Matcher: failed to insert link for evidence {}: {}",
                    evidence.id, e
                );
                stats.individual_operation_errors += 1;
            }
        }
    }

    pb.finish_with_message(format!("{} links created", stats.links_created));
    stats.matching_time = start.elapsed().as_secs_f64();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(title: &str, findings: &str) -> Evidence {
        Evidence {
            id: "ev-1".to_string(),
            title: Some(title.to_string()),
            findings: Some(findings.to_string()),
            organization: None,
            evidence_type: None,
        }
    }

    fn named_intervention(id: &str, name: &str, description: &str) -> Intervention {
        Intervention {
            id: id.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            operating_organization: None,
            geography: Vec::new(),
            intervention_type: None,
        }
    }

    #[test]
    fn test_threshold_boundary() {
        // Title affinity alone scores 40 and must not link at the default
        // threshold; one extra shared keyword lands exactly on 45.
        let below = evidence("On Country camps", "No shared vocabulary here");
        let candidates = vec![named_intervention("int-1", "On Country camps", "Camp details")];
        assert!(select_best_match(&below, &candidates, rules::DEFAULT_SCORE_THRESHOLD).is_none());

        let at = evidence("On Country camps", "Findings about diversion");
        let candidates = vec![named_intervention(
            "int-1",
            "On Country camps",
            "A diversion alternative",
        )];
        let selected = select_best_match(&at, &candidates, rules::DEFAULT_SCORE_THRESHOLD)
            .expect("score of exactly 45 must be linkable");
        assert_eq!(selected.score, 45);
    }

    #[test]
    fn test_first_match_wins_on_tie() {
        let ev = evidence("Youth diversion evaluation", "diversion and detention findings");
        // Two interventions that score identically; the first encountered
        // must win.
        let candidates = vec![
            named_intervention("int-a", "Youth diversion evaluation", "detention alternative"),
            named_intervention("int-b", "Youth diversion evaluation", "detention alternative"),
        ];
        let selected =
            select_best_match(&ev, &candidates, rules::DEFAULT_SCORE_THRESHOLD).expect("match");
        assert_eq!(selected.intervention.id, "int-a");
    }

    #[test]
    fn test_higher_score_replaces_earlier_candidate() {
        let ev = evidence(
            "Youth diversion evaluation",
            "diversion findings for youth in detention",
        );
        // Both clear the threshold; the later candidate scores an extra
        // shared keyword and must displace the earlier one.
        let candidates = vec![
            named_intervention("int-weak", "Youth diversion evaluation", "no extra terms"),
            named_intervention(
                "int-strong",
                "Youth diversion evaluation",
                "a detention alternative",
            ),
        ];
        let selected =
            select_best_match(&ev, &candidates, rules::DEFAULT_SCORE_THRESHOLD).expect("match");
        assert_eq!(selected.intervention.id, "int-strong");
        assert!(selected.score > rules::DEFAULT_SCORE_THRESHOLD);
    }

    #[test]
    fn test_breakdown_json_keeps_only_scoring_rules() {
        let ev = evidence("Youth diversion evaluation", "diversion findings");
        let candidates = vec![named_intervention(
            "int-1",
            "Youth diversion evaluation",
            "diversion support",
        )];
        let selected =
            select_best_match(&ev, &candidates, rules::DEFAULT_SCORE_THRESHOLD).expect("match");
        let details = breakdown_json(&selected);
        assert_eq!(details["total"], selected.score);
        let rule_map = details["rules"].as_object().expect("rules object");
        assert!(rule_map.contains_key("title_affinity"));
        assert!(!rule_map.contains_key("category_affinity"));
    }
}
