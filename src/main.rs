use alma_lib::config::MatcherConfig;
use alma_lib::matching::run_evidence_linking;
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
#[command(author, version, about = "Links evidence records to their best-matching intervention", long_about = None)]
struct LinkEvidenceArgs {
    /// Score and report planned links without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Override the minimum link score (env: MATCH_SCORE_THRESHOLD)
    #[arg(long)]
    threshold: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting ALMA evidence linking run");
    load_env();

    let args = LinkEvidenceArgs::parse();
    let config = MatcherConfig::from_env().with_threshold_override(args.threshold);
    config.log_config();
    let progress_config = ProgressConfig::from_env();

    if args.dry_run {
        info!("Dry run mode: no links will be written");
    }

    let pool = connect().await.context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let run_id = Uuid::new_v4().to_string();
    info!("Run ID: {}", run_id);

    let start = Instant::now();
    let stats = run_evidence_linking(&pool, &config, &progress_config, &run_id, args.dry_run)
        .await
        .context("Evidence linking run failed")?;

    info!("=== Evidence Linking Summary ===");
    info!("Run ID: {}", stats.run_id);
    info!("Evidence records: {}", stats.evidence_total);
    info!("Interventions: {}", stats.interventions_total);
    info!("Already linked (skipped): {}", stats.evidence_already_linked);
    info!("Links created: {}", stats.links_created);
    info!("Skipped on conflict: {}", stats.links_skipped_conflict);
    info!("Below threshold: {}", stats.below_threshold);
    info!("Failed inserts: {}", stats.individual_operation_errors);
    info!("Average match score: {:.1}", stats.avg_match_score());
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

    info!("Evidence linking completed successfully!");
    Ok(())
}
