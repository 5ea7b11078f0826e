//! WebRank Ingestion
//!
//! Batch side of the ranking engine:
//! 1. `rank`: builds the link graph of a crawl snapshot and attaches PageRank
//!    authority (and optionally a completion suggestion) to every page
//! 2. `upload`: bulk indexes ranked pages into the search service

mod crawl;
mod errors;
mod processor;
mod suggest;

use clap::{Parser, Subcommand};
use processor::{write_failures, RankingJob, UploadJob};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use webrank_common::backend::{wait_until_ready, ElasticsearchClient, SearchBackend};
use webrank_common::config::{AppConfig, ObservabilityConfig};
use webrank_common::{metrics, telemetry, VERSION};
use webrank_search::PageRankConfig;

#[derive(Parser)]
#[command(
    name = "ingestion",
    about = "Authority scoring and bulk upload of crawled pages",
    version
)]
struct Cli {
    /// Configuration file (defaults to config/default, config/{APP_ENV}, config/local)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute PageRank for a crawl snapshot (JSON Lines, or CSV when the file ends in .csv)
    Rank {
        /// Crawl snapshot, one record per line or row
        #[arg(short, long)]
        input: PathBuf,

        /// Ranked pages output, same format rules as the input
        #[arg(short, long)]
        output: PathBuf,

        /// Add a completion suggestion derived from each title
        #[arg(long)]
        with_suggest: bool,
    },

    /// Bulk index ranked pages into the search service
    Upload {
        /// Ranked pages, JSON Lines or CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Pages per bulk request
        #[arg(short, long, default_value_t = 1000)]
        batch_size: usize,

        /// Write pages the service rejected, with reasons, to this JSON file
        #[arg(long)]
        failures: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    // Load configuration
    let loaded = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(&ObservabilityConfig::default());
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    telemetry::init_tracing(&config.observability);
    metrics::register_metrics();
    info!("Starting WebRank ingestion v{}", VERSION);

    match args.command {
        Commands::Rank {
            input,
            output,
            with_suggest,
        } => {
            let job = RankingJob::new(PageRankConfig::from(&config.authority), with_suggest);
            let summary = job.run(&input, &output).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Upload {
            input,
            batch_size,
            failures,
        } => {
            let backend: Arc<dyn SearchBackend> = Arc::new(ElasticsearchClient::new(&config)?);

            info!(url = %config.search_service.url, "Connecting to search service...");
            wait_until_ready(backend.as_ref(), config.connect_retry())
                .await
                .map_err(|e| {
                    error!(error = %e, "Search service unreachable");
                    e
                })?;

            let job = UploadJob::new(backend, batch_size, config.search_service.bulk_concurrency);
            let summary = job.run(&input).await?;

            if let Some(path) = failures {
                if !summary.report.failures.is_empty() {
                    write_failures(&path, &summary.report.failures).await?;
                }
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
