//! # Brand Assignment Job
//!
//! Resolves every catalog item of one source to a canonical brand and stores
//! the results.
//!
//! ## Configuration
//!
//! - `DATABASE_PATH`: SQLite database file (default: "brands.db")
//! - `BRAND_SOURCE`: catalog source to process (default: "default")
//! - `BRAND_CHUNK_SIZE`: items per chunk (default: 100)
//! - `BRAND_WORKERS`: chunks resolved at the same time (default: 1)
//! - `BRAND_IGNORE_WORDS`, `BRAND_FRONT_WORDS`, `BRAND_FIRST_OR_SECOND_WORDS`,
//!   `BRAND_EXACT_WORDS`: `;`-separated replacements for the validation word lists
//!
//! Ctrl-C stops the run after the chunk being stored; unfinished chunks are
//! dropped and picked up again by the next run.

use anyhow::{Context, Result};
use brand_resolver::brand::batch::{BatchProcessor, LogProgress};
use brand_resolver::brand::BrandResolver;
use brand_resolver::db::{Database, DatabaseSink};
use brand_resolver::environment::RunConfig;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    brand_resolver::logging::configure_logging();

    let config = RunConfig::from_env();
    info!(
        "Assigning brands for source '{}' (chunk size {}, {} worker(s))",
        config.source, config.chunk_size, config.workers
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
            return;
        }
        info!("Ctrl-C received, stopping after the current chunk");
        let _ = cancel_tx.send(true);
    });

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to open database")?;

    let associations = db
        .load_brand_associations()
        .await
        .context("Failed to load brand associations")?;
    let resolver = Arc::new(BrandResolver::from_associations(
        &associations,
        config.rules.clone(),
    ));

    let mut catalog = db
        .catalog_cursor(&config.source)
        .await
        .context("Failed to open catalog")?;
    let sink = DatabaseSink::new(&db, &config.source);

    let summary = BatchProcessor::new(resolver, &config.source)
        .with_chunk_size(config.chunk_size)
        .with_workers(config.workers)
        .run(&mut catalog, &sink, &LogProgress, &cancel_rx)
        .await?;

    if summary.cancelled {
        info!(
            "Run cancelled after {} chunks; completed chunks are stored",
            summary.chunks
        );
    } else {
        info!(
            "Completed processing {} items ({} matched, {} unmatched, {} skipped)",
            summary.processed + summary.skipped,
            summary.matched,
            summary.unmatched,
            summary.skipped
        );
    }

    Ok(())
}
