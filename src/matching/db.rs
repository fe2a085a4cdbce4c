// src/matching/db.rs

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use tokio_postgres::GenericClient;

use crate::models::{Evidence, Intervention, NewEvidenceLink};
use crate::utils::db_connect::PgPool;

/// Loads every evidence row in one unbounded query. The dataset is assumed
/// to fit in memory.
pub async fn fetch_all_evidence(conn: &impl GenericClient) -> Result<Vec<Evidence>> {
    let query = "
        SELECT id, title, findings, organization, evidence_type
        FROM public.alma_evidence";
    let rows = conn
        .query(query, &[])
        .await
        .context("Failed to query evidence records")?;
    rows.iter()
        .map(|row| {
            Ok(Evidence {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                findings: row.try_get("findings")?,
                organization: row.try_get("organization")?,
                evidence_type: row.try_get("evidence_type")?,
            })
        })
        .collect()
}

/// Loads every intervention row in one unbounded query.
pub async fn fetch_all_interventions(conn: &impl GenericClient) -> Result<Vec<Intervention>> {
    let query = "
        SELECT id, name, description, operating_organization, geography, type
        FROM public.alma_interventions";
    let rows = conn
        .query(query, &[])
        .await
        .context("Failed to query intervention records")?;
    rows.iter()
        .map(|row| {
            let geography: Option<Vec<String>> = row.try_get("geography")?;
            Ok(Intervention {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                operating_organization: row.try_get("operating_organization")?,
                geography: geography.unwrap_or_default(),
                intervention_type: row.try_get("type")?,
            })
        })
        .collect()
}

/// Evidence ids that already carry a link. Those records are skipped before
/// scoring, which is what makes a re-run of the matcher a no-op.
pub async fn fetch_linked_evidence_ids(conn: &impl GenericClient) -> Result<HashSet<String>> {
    let rows = conn
        .query(
            "SELECT DISTINCT evidence_id FROM public.alma_intervention_evidence",
            &[],
        )
        .await
        .context("Failed to query existing evidence links")?;
    Ok(rows
        .iter()
        .map(|row| row.get::<_, String>("evidence_id"))
        .collect())
}

/// Inserts a link row. The unique index on `evidence_id` makes this an
/// atomic insert-if-not-exists: a concurrent run that got there first turns
/// this call into a no-op rather than a duplicate link.
///
/// Returns `true` if the row was inserted, `false` on conflict.
pub async fn insert_evidence_link(pool: &PgPool, link: &NewEvidenceLink) -> Result<bool> {
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for insert_evidence_link")?;

    const INSERT_SQL: &str = "
        INSERT INTO public.alma_intervention_evidence
            (intervention_id, evidence_id, match_score, match_details, created_at)
        VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP)
        ON CONFLICT (evidence_id) DO NOTHING";

    let rows_affected = conn
        .execute(
            INSERT_SQL,
            &[
                &link.intervention_id,
                &link.evidence_id,
                &link.match_score,
                &link.match_details,
            ],
        )
        .await
        .context(format!(
            "Failed to insert link for evidence {}",
            link.evidence_id
        ))?;

    debug!(
        "Link insert for evidence {} -> intervention {}: rows_affected={}",
        link.evidence_id, link.intervention_id, rows_affected
    );
    Ok(rows_affected == 1)
}
