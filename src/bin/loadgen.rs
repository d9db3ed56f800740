//! # Table Repository Load Generator
//!
//! Writes synthetic entities across several partitions through the in-memory
//! table client with the configured parallelism, then prints the write report.
//! Useful for checking a configuration and watching the batch logs.

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use table_repository::config::ConfigManager;
use table_repository::logging::init_structured_logging;
use table_repository::{
    BatchState, InMemoryTableClient, ParallelismPolicy, PartitionIdentity, TableRepository,
    TableSettings, WriteError, WriteReport, RepositoryError,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "table-repository-loadgen")]
#[command(about = "Write synthetic entities through the partitioned batch writer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Number of entities to write
    #[arg(short = 'n', long, default_value_t = 1000)]
    entities: usize,

    /// Number of distinct partition keys
    #[arg(short, long, default_value_t = 4)]
    partitions: usize,

    /// Configuration directory (default: $TABLE_REPOSITORY_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to apply (default: detected)
    #[arg(short, long)]
    environment: Option<String>,

    /// Override parallelism.partition_concurrency
    #[arg(long)]
    partition_concurrency: Option<usize>,

    /// Override parallelism.batch_concurrency
    #[arg(long)]
    batch_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SyntheticEntity {
    partition: String,
    row: String,
    sequence: usize,
}

impl PartitionIdentity for SyntheticEntity {
    fn partition_key(&self) -> &str {
        &self.partition
    }
    fn row_key(&self) -> &str {
        &self.row
    }
}

#[tokio::main]
async fn main() {
    init_structured_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => print_report(&report),
        Err(err) => {
            eprintln!("❌ {err:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<WriteReport> {
    let manager = match &cli.environment {
        Some(environment) => ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment),
        None => ConfigManager::load_from_directory(cli.config_dir.clone()),
    }
    .context("failed to load configuration")?;
    let config = manager.config();

    let cancellation = CancellationToken::new();
    let on_signal = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining batches");
            on_signal.cancel();
        }
    });

    let policy = ParallelismPolicy::with_cancellation(
        cli.partition_concurrency
            .unwrap_or(config.parallelism.partition_concurrency),
        cli.batch_concurrency
            .unwrap_or(config.parallelism.batch_concurrency),
        cancellation,
    )
    .context("invalid parallelism")?;

    let client = Arc::new(InMemoryTableClient::new());
    let repository: TableRepository<SyntheticEntity, _> =
        TableRepository::connect(&TableSettings::from(&config.storage), Arc::clone(&client))
            .await
            .context("failed to connect")?;

    let partitions = cli.partitions.max(1);
    let entities = (0..cli.entities).map(|sequence| SyntheticEntity {
        partition: format!("partition-{:03}", sequence % partitions),
        row: format!("{sequence:010}"),
        sequence,
    });

    info!(
        entities = cli.entities,
        partitions,
        partition_concurrency = policy.partition_concurrency(),
        batch_concurrency = policy.batch_concurrency(),
        "Starting load"
    );

    match repository.insert_or_replace_parallel(entities, &policy).await {
        Ok(report) => Ok(report),
        Err(RepositoryError::Write(
            WriteError::BatchesFailed { report } | WriteError::Cancelled { report },
        )) => {
            print_report(&report);
            anyhow::bail!(
                "write incomplete: {} failed, {} skipped",
                report.failed_count(),
                report.skipped_count()
            )
        }
        Err(err) => Err(err).context("write failed"),
    }
}

fn print_report(report: &WriteReport) {
    println!(
        "batches: {}  succeeded: {}  failed: {}  skipped: {}  entities written: {}  elapsed: {:?}",
        report.batch_count(),
        report.succeeded_count(),
        report.failed_count(),
        report.skipped_count(),
        report.written_entity_count(),
        report.elapsed()
    );
    for outcome in report.outcomes() {
        if let BatchState::Failed(err) = &outcome.state {
            println!("  {} ({} entities): {err}", outcome.id, outcome.entity_count);
        }
    }
}
