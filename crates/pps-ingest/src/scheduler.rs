//! Background scheduler
//!
//! Long-running loop for the worker process: provision the search index
//! once, then ingest the latest monthly snapshot on a fixed cadence. A
//! failed cycle is logged and retried only at the next scheduled cycle;
//! the inter-cycle sleep is cancellable so shutdown never waits out the
//! full interval.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::geo::PostcodeStore;
use crate::pricepaid::export::ExportKind;
use crate::pricepaid::{DatasetSelector, IngestOutcome, IngestionOrchestrator};
use crate::search::{ensure_search_index, SearchClient};
use crate::storage::{ObjectStore, StorageConfig};

/// Drives provisioning and ingestion for the process lifetime
pub struct BackgroundScheduler<O, S> {
    orchestrator: IngestionOrchestrator<O, S>,
    search: SearchClient,
    storage_config: StorageConfig,
    export_kind: ExportKind,
    interval: Duration,
}

impl<O, S> BackgroundScheduler<O, S>
where
    O: ObjectStore,
    S: PostcodeStore + Clone,
{
    pub fn new(
        orchestrator: IngestionOrchestrator<O, S>,
        search: SearchClient,
        storage_config: StorageConfig,
        export_kind: ExportKind,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            search,
            storage_config,
            export_kind,
            interval,
        }
    }

    /// Run until cancelled.
    ///
    /// Provisioning failure is fatal: the loop never starts ingesting
    /// against an unverified index, and the error propagates to the
    /// caller. Ingestion failures are logged and the loop continues.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!("Background scheduler starting");

        ensure_search_index(&self.search, &self.storage_config, self.export_kind)
            .await
            .context("Search index provisioning failed")?;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self
                .orchestrator
                .run(DatasetSelector::LatestMonth, &cancel)
                .await
            {
                Ok(IngestOutcome::Completed { hash, rows }) => {
                    info!(hash = %hash, rows, "Ingestion cycle completed");
                }
                Ok(IngestOutcome::NothingToDo { hash }) => {
                    info!(hash = %hash, "Ingestion cycle found nothing new");
                }
                Err(e) => {
                    // No retry within the cycle; the next scheduled attempt
                    // starts from scratch after the full interval.
                    error!(error = %e, "Ingestion cycle failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Background scheduler shutting down gracefully");
        Ok(())
    }
}
