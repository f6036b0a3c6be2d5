use anyhow::{Context, Result};
use brand_resolver::brand::batch::{BatchProcessor, LogProgress, MemorySink, VecCatalog};
use brand_resolver::brand::types::{BrandAssociation, CatalogItem};
use brand_resolver::brand::{BrandResolver, HeuristicRules};
use brand_resolver::db::Database;
use brand_resolver::environment::{get_env_var_or, rules_from_env, DATABASE_PATH};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::main;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import manufacturer associations from a JSON file
    ImportAssociations {
        /// JSON array of {"manufacturer_p1", "manufacturers_p2"} records
        #[arg(short, long)]
        file: PathBuf,

        /// Remove existing associations first
        #[arg(long)]
        replace: bool,
    },

    /// Import catalog items from a JSON file
    ImportItems {
        /// JSON array of {"source_id", "title"} records
        #[arg(short, long)]
        file: PathBuf,

        /// Source the items belong to
        #[arg(short, long, default_value = "default")]
        source: String,
    },

    /// Show how a single title is resolved
    Resolve {
        /// Product title
        #[arg(short, long)]
        title: String,
    },

    /// Show the cluster and canonical brand of an alias
    Cluster {
        /// Brand alias
        #[arg(short, long)]
        alias: String,
    },

    /// Resolve a JSON file of items without storing anything
    DryRun {
        /// JSON array of catalog items
        #[arg(short, long)]
        file: PathBuf,

        /// Source name used for record ids
        #[arg(short, long, default_value = "default")]
        source: String,

        /// Items per chunk
        #[arg(short, long, default_value = "100")]
        chunk_size: usize,
    },

    /// Display brand assignment statistics
    Stats {
        /// Catalog source
        #[arg(short, long, default_value = "default")]
        source: String,

        /// Number of brands to list
        #[arg(short, long, default_value = "10")]
        top: i64,
    },
}

#[main]
async fn main() -> Result<()> {
    brand_resolver::logging::configure_logging();

    let cli = Cli::parse();

    let database_path = get_env_var_or(DATABASE_PATH, "brands.db".to_string());
    let db = Database::new(&database_path)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::ImportAssociations { file, replace } => {
            let associations: Vec<BrandAssociation> = read_json(&file)?;
            if replace {
                let removed = db.clear_brand_associations().await?;
                info!("Removed {} existing associations", removed);
            }
            let count = db.import_brand_associations(&associations).await?;
            println!("Successfully imported {} associations", count);
        }

        Commands::ImportItems { file, source } => {
            let items: Vec<CatalogItem> = read_json(&file)?;
            let count = db.import_catalog_items(&source, &items).await?;
            println!("Successfully imported {} items into '{}'", count, source);
        }

        Commands::Resolve { title } => {
            let resolver = load_resolver(&db).await?;
            let trace = resolver.explain(&title);

            println!("Resolving '{}':", title);
            println!("  - Candidates: {}", trace.candidates.join(", "));
            println!("  - Term matches: {}", trace.term_matches.join(", "));
            println!("  - Validated: {}", trace.validated.join(", "));
            println!(
                "  - Final brand: {}",
                trace.final_brand.as_deref().unwrap_or("none")
            );
        }

        Commands::Cluster { alias } => {
            let resolver = load_resolver(&db).await?;
            let members = resolver.cluster_members(&alias);

            if members.is_empty() {
                println!("'{}' is not a known alias", alias);
            } else {
                println!(
                    "Canonical brand: {}",
                    resolver.canonical_brand(&alias.to_lowercase())
                );
                println!("Cluster members ({}):", members.len());
                for member in members {
                    println!("  - {}", member);
                }
            }
        }

        Commands::DryRun {
            file,
            source,
            chunk_size,
        } => {
            let items: Vec<CatalogItem> = read_json(&file)?;
            let resolver = Arc::new(load_resolver(&db).await?);
            let sink = MemorySink::new();
            let (_cancel_tx, cancel_rx) = watch::channel(false);

            let summary = BatchProcessor::new(resolver, &source)
                .with_chunk_size(chunk_size)
                .run(&mut VecCatalog::new(items), &sink, &LogProgress, &cancel_rx)
                .await?;

            let mut counter = 0;
            for (_, results) in sink.into_chunks() {
                for result in results {
                    println!("{}# {}", counter, result);
                    counter += 1;
                }
            }
            println!(
                "{} processed, {} matched, {} unmatched, {} skipped",
                summary.processed, summary.matched, summary.unmatched, summary.skipped
            );
        }

        Commands::Stats { source, top } => {
            let stats = db.brand_stats(&source, top).await?;

            println!("Brand Statistics for '{}':", source);
            println!("  - Associations: {}", stats.associations);
            println!("  - Catalog items: {}", stats.catalog_items);
            println!("  - Matched items: {}", stats.matched_items);
            println!("  - Unmatched items: {}", stats.unmatched_items);

            if !stats.top_brands.is_empty() {
                println!("\nTop brands:");
                for (brand, count) in stats.top_brands {
                    println!("  - {}: {}", brand, count);
                }
            }
        }
    }

    Ok(())
}

async fn load_resolver(db: &Database) -> Result<BrandResolver> {
    let associations = db.load_brand_associations().await?;
    Ok(BrandResolver::from_associations(
        &associations,
        rules_from_env(HeuristicRules::default()),
    ))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}
