// src/bin/dedupe_interventions.rs

use alma_lib::config::DedupConfig;
use alma_lib::dedup::run_intervention_dedup;
use alma_lib::utils::db_connect::{connect, get_pool_status};
use alma_lib::utils::env::load_env;
use alma_lib::utils::get_memory_usage;
use alma_lib::utils::progress_config::ProgressConfig;
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::time::Instant;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Removes duplicate intervention records, keeping the richest copy", long_about = None)]
struct DedupeArgs {
    /// Report duplicate groups and planned deletions without deleting
    #[arg(long)]
    dry_run: bool,

    /// Override the fuzzy similarity threshold (env: DEDUP_SIMILARITY_THRESHOLD)
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Cap on processed duplicate entries per run (env: DEDUP_MAX_ENTRIES)
    #[arg(long)]
    max_entries: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting ALMA intervention deduplication run");
    load_env();

    let args = DedupeArgs::parse();
    let config =
        DedupConfig::from_env().with_overrides(args.similarity_threshold, args.max_entries);
    config.log_config();
    let progress_config = ProgressConfig::from_env();

    if args.dry_run {
        info!("Dry run mode: no records will be deleted");
    }

    let pool = connect().await.context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let run_id = Uuid::new_v4().to_string();
    info!("Run ID: {}", run_id);

    let start = Instant::now();
    let stats = run_intervention_dedup(&pool, &config, &progress_config, &run_id, args.dry_run)
        .await
        .context("Deduplication run failed")?;

    info!("=== Deduplication Summary ===");
    info!("Run ID: {}", stats.run_id);
    info!("Interventions: {}", stats.interventions_total);
    info!("Exact duplicate groups: {}", stats.exact_groups);
    info!("Fuzzy duplicate pairs: {}", stats.fuzzy_pairs);
    info!(
        "Candidate pairs evaluated: {}",
        stats.candidate_pairs_evaluated
    );
    if stats.entries_truncated_by_cap > 0 {
        info!(
            "Entries dropped by processing cap: {}",
            stats.entries_truncated_by_cap
        );
    }
    info!("Deletions planned: {}", stats.deletions_planned);
    info!("Deletions applied: {}", stats.deletions_applied);
    info!("Failed deletions: {}", stats.individual_operation_errors);
    info!("Total execution time: {:.2?}", start.elapsed());

    if stats.individual_operation_errors > 0 {
        warn!(
            "Run completed with {} per-record failures; see log for details",
            stats.individual_operation_errors
        );
    }

    let final_memory_mb = get_memory_usage().await;
    info!("Final memory usage: {} MB", final_memory_mb);

    let (pool_size, available_connections, in_use_connections) = get_pool_status(&pool);
    info!(
        "Final DB Connection Pool Status: Total: {}, Available: {}, In Use: {}",
        pool_size, available_connections, in_use_connections
    );

    info!("Deduplication completed successfully!");
    Ok(())
}
