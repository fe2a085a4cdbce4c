// src/models/core.rs

use serde::{Deserialize, Serialize};

/// An evidence document describing program outcomes, used as matching input.
///
/// Rows come from `public.alma_evidence`. All text columns are nullable in the
/// store, so everything except the id is optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub title: Option<String>,
    pub findings: Option<String>,
    pub organization: Option<String>,
    pub evidence_type: Option<String>,
}

/// A named program or service that evidence may support.
///
/// Rows come from `public.alma_interventions`. `geography` is an ordered list
/// of region codes (e.g. "NT", "QLD"); the column name `type` is reserved in
/// Rust, hence `intervention_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub operating_organization: Option<String>,
    pub geography: Vec<String>,
    pub intervention_type: Option<String>,
}

/// A link row waiting to be written to `public.alma_intervention_evidence`.
#[derive(Debug, Clone)]
pub struct NewEvidenceLink {
    pub intervention_id: String,
    pub evidence_id: String,
    pub match_score: i32,
    /// Per-rule point breakdown, persisted for later review.
    pub match_details: serde_json::Value,
}

impl Evidence {
    pub fn title_lower(&self) -> String {
        self.title.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn findings_lower(&self) -> String {
        self.findings.as_deref().unwrap_or_default().to_lowercase()
    }
}

impl Intervention {
    pub fn name_lower(&self) -> String {
        self.name.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn description_lower(&self) -> String {
        self.description.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn description_len(&self) -> usize {
        self.description.as_deref().map_or(0, |d| d.len())
    }
}
