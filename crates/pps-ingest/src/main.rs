//! pps-ingest — price-paid ingestion worker entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pps_common::logging::{init_logging, LogConfig};
use pps_ingest::config::IngestConfig;
use pps_ingest::geo::PgPostcodeStore;
use pps_ingest::pricepaid::download::DatasetSource;
use pps_ingest::pricepaid::store::DatasetStore;
use pps_ingest::pricepaid::{DatasetSelector, IngestOutcome, IngestionOrchestrator};
use pps_ingest::scheduler::BackgroundScheduler;
use pps_ingest::search::{SearchClient, SearchConfig};
use pps_ingest::storage::{S3ObjectStore, StorageConfig};

/// Price-paid ingestion worker
#[derive(Debug, Parser)]
#[command(name = "pps-ingest", about = "Ingests Land Registry price-paid data")]
struct Args {
    /// Ingest the complete dataset for one calendar year, then exit
    /// (instead of running the scheduled daemon)
    #[arg(long)]
    year: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging(&LogConfig::from_env())?;

    let args = Args::parse();

    info!("Starting price-paid ingestion worker");

    let config = IngestConfig::from_env()?;
    let storage_config = StorageConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to postcode database")?;
    info!("Postcode database connection established");

    let object_store = Arc::new(S3ObjectStore::new(storage_config.clone()));
    let source = DatasetSource::new(config.dataset_base_url.clone())?;
    let orchestrator = IngestionOrchestrator::new(
        source,
        DatasetStore::new(object_store),
        PgPostcodeStore::new(pool),
        config.export_format,
    );

    let cancel = CancellationToken::new();

    // One-shot backfill: a single attempt against an already-provisioned
    // deployment, no scheduler loop.
    if let Some(year) = args.year {
        info!(year, "Running one-shot backfill");

        match orchestrator.run(DatasetSelector::Year(year), &cancel).await? {
            IngestOutcome::Completed { hash, rows } => {
                info!(hash = %hash, rows, "Backfill completed");
            }
            IngestOutcome::NothingToDo { hash } => {
                info!(hash = %hash, "Backfill found nothing new");
            }
        }
        return Ok(());
    }

    let search = SearchClient::new(SearchConfig::from_env()?)?;
    let scheduler = BackgroundScheduler::new(
        orchestrator,
        search,
        storage_config,
        config.export_format,
        config.cycle_interval(),
    );

    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    shutdown_signal().await;
    info!("Shutdown signal received, cancelling background work");
    cancel.cancel();

    handle.await.context("Scheduler task panicked")??;

    info!("Worker shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
