// src/dedup/db.rs

use anyhow::{Context, Result};
use log::debug;

use crate::utils::db_connect::PgPool;

/// Deletes a single intervention row. Returns `true` if a row was removed,
/// `false` if it was already gone.
pub async fn delete_intervention(pool: &PgPool, intervention_id: &str) -> Result<bool> {
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for delete_intervention")?;

    let rows_affected = conn
        .execute(
            "DELETE FROM public.alma_interventions WHERE id = $1",
            &[&intervention_id],
        )
        .await
        .context(format!("Failed to delete intervention {}", intervention_id))?;

    debug!(
        "Delete intervention {}: rows_affected={}",
        intervention_id, rows_affected
    );
    Ok(rows_affected == 1)
}
