// src/matching/rules.rs
//! Scoring rules for evidence-intervention compatibility.
//!
//! Each rule is a pure function `(Evidence, Intervention) -> points`; the
//! ordered [`SCORING_RULES`] list is summed by [`score_pair`]. Weights and
//! the link threshold live here so they can be tested in isolation.

use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::{Evidence, Intervention};

pub const TITLE_AFFINITY_POINTS: u32 = 40;
pub const KEYWORD_POINTS: u32 = 5;
pub const ORGANIZATION_AFFINITY_POINTS: u32 = 30;
pub const GEOGRAPHY_MENTION_POINTS: u32 = 10;
pub const CATEGORY_AFFINITY_POINTS: u32 = 20;

/// Minimum combined score for a candidate pair to be linkable.
pub const DEFAULT_SCORE_THRESHOLD: u32 = 45;

/// Titles that don't contain each other still earn the title points when
/// they are near-identical as strings.
pub const TITLE_FUZZY_THRESHOLD: f64 = 0.90;

/// Domain vocabulary shared by evidence findings and intervention
/// descriptions in the youth-justice registry.
pub const DOMAIN_KEYWORDS: [&str; 12] = [
    "youth",
    "justice",
    "diversion",
    "detention",
    "aboriginal",
    "indigenous",
    "prevention",
    "recidivism",
    "mentoring",
    "bail",
    "rehabilitation",
    "community",
];

/// Evidence-type / intervention-type pairs with a known affinity.
const CATEGORY_AFFINITIES: [(&str, &str); 1] = [("Community-led research", "Cultural Connection")];

/// A named, independently testable scoring contribution.
pub struct ScoringRule {
    pub name: &'static str,
    pub points: fn(&Evidence, &Intervention) -> u32,
}

pub const SCORING_RULES: [ScoringRule; 5] = [
    ScoringRule {
        name: "title_affinity",
        points: title_affinity,
    },
    ScoringRule {
        name: "shared_keywords",
        points: shared_keywords,
    },
    ScoringRule {
        name: "organization_affinity",
        points: organization_affinity,
    },
    ScoringRule {
        name: "geography_mention",
        points: geography_mention,
    },
    ScoringRule {
        name: "category_affinity",
        points: category_affinity,
    },
];

/// Sums every rule for one evidence/intervention pair.
pub fn score_pair(evidence: &Evidence, intervention: &Intervention) -> u32 {
    SCORING_RULES
        .iter()
        .map(|rule| (rule.points)(evidence, intervention))
        .sum()
}

/// Like [`score_pair`], but keeps the per-rule breakdown for reporting.
pub fn score_pair_detailed(
    evidence: &Evidence,
    intervention: &Intervention,
) -> (u32, Vec<(&'static str, u32)>) {
    let breakdown: Vec<(&'static str, u32)> = SCORING_RULES
        .iter()
        .map(|rule| (rule.name, (rule.points)(evidence, intervention)))
        .collect();
    let total = breakdown.iter().map(|(_, points)| points).sum();
    (total, breakdown)
}

fn title_affinity(evidence: &Evidence, intervention: &Intervention) -> u32 {
    let title = evidence.title_lower();
    let name = intervention.name_lower();
    if title.is_empty() || name.is_empty() {
        return 0;
    }
    if title.contains(&name) || name.contains(&title) {
        return TITLE_AFFINITY_POINTS;
    }
    if jaro_winkler(&title, &name) >= TITLE_FUZZY_THRESHOLD {
        return TITLE_AFFINITY_POINTS;
    }
    0
}

fn shared_keywords(evidence: &Evidence, intervention: &Intervention) -> u32 {
    let evidence_text = format!("{} {}", evidence.title_lower(), evidence.findings_lower());
    let intervention_text = format!(
        "{} {}",
        intervention.name_lower(),
        intervention.description_lower()
    );
    let shared = DOMAIN_KEYWORDS
        .iter()
        .filter(|kw| evidence_text.contains(*kw) && intervention_text.contains(*kw))
        .count() as u32;
    shared * KEYWORD_POINTS
}

fn organization_affinity(evidence: &Evidence, intervention: &Intervention) -> u32 {
    let org1 = evidence
        .organization
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let org2 = intervention
        .operating_organization
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let org1 = org1.trim();
    let org2 = org2.trim();
    if org1.is_empty() || org2.is_empty() {
        return 0;
    }
    if org1.contains(org2) || org2.contains(org1) {
        return ORGANIZATION_AFFINITY_POINTS;
    }
    let words1: HashSet<&str> = org1.split_whitespace().collect();
    if org2.split_whitespace().any(|word| words1.contains(word)) {
        return ORGANIZATION_AFFINITY_POINTS;
    }
    0
}

fn geography_mention(evidence: &Evidence, intervention: &Intervention) -> u32 {
    let findings = evidence.findings_lower();
    if findings.is_empty() {
        return 0;
    }
    let mentioned = intervention
        .geography
        .iter()
        .filter(|region| !region.is_empty() && findings.contains(&region.to_lowercase()))
        .count() as u32;
    mentioned * GEOGRAPHY_MENTION_POINTS
}

fn category_affinity(evidence: &Evidence, intervention: &Intervention) -> u32 {
    if let (Some(etype), Some(itype)) = (
        evidence.evidence_type.as_deref(),
        intervention.intervention_type.as_deref(),
    ) {
        let affinity = CATEGORY_AFFINITIES.iter().any(|(affinity_etype, affinity_itype)| {
            etype.eq_ignore_ascii_case(affinity_etype) && itype.eq_ignore_ascii_case(affinity_itype)
        });
        if affinity {
            return CATEGORY_AFFINITY_POINTS;
        }
    }
    0
}
