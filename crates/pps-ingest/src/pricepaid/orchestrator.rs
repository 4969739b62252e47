//! Ingestion orchestrator
//!
//! Coordinates one end-to-end ingestion attempt:
//! download → hash comparison → (short-circuit | enrich → export → record).
//! There is no partial-success model inside an attempt: either the dataset
//! is enriched, exported and marked complete, or nothing durable claims it
//! was. Errors are not caught here; the scheduler owns the decision to
//! carry on or stop.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pps_common::hashing::content_hash;

use super::download::DatasetSource;
use super::enrich::RowEnricher;
use super::export::{self, ExportKind};
use super::models::{DatasetSelector, IngestOutcome};
use super::store::DatasetStore;
use crate::geo::{GeoCache, PostcodeStore};
use crate::storage::ObjectStore;

/// Owns the lifecycle of single ingestion attempts
pub struct IngestionOrchestrator<O, S> {
    source: DatasetSource,
    store: DatasetStore<O>,
    postcodes: S,
    export_kind: ExportKind,
}

impl<O, S> IngestionOrchestrator<O, S>
where
    O: ObjectStore,
    S: PostcodeStore + Clone,
{
    pub fn new(
        source: DatasetSource,
        store: DatasetStore<O>,
        postcodes: S,
        export_kind: ExportKind,
    ) -> Self {
        Self {
            source,
            store,
            postcodes,
            export_kind,
        }
    }

    /// Run one ingestion attempt end to end.
    pub async fn run(
        &self,
        selector: DatasetSelector,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome> {
        let payload = self.source.download(selector).await?;

        let hash = content_hash(&payload);
        let ingested = self.store.ingested_hashes().await?;

        if ingested.contains(&hash) {
            info!(hash = %hash, "Dataset already ingested, nothing to do");
            return Ok(IngestOutcome::NothingToDo { hash });
        }

        info!(
            hash = %hash,
            known_datasets = ingested.len(),
            "New dataset detected, starting enrichment"
        );

        // A fresh cache per attempt: entries live for the run, keyed by the
        // raw postcode strings of this snapshot.
        let cache = GeoCache::new(self.postcodes.clone());
        let enricher = RowEnricher::new(&cache);
        let enriched = enricher.enrich(&payload, cancel).await?;
        let rows = enriched.len();

        let format = self.export_kind.format();
        let chunks = export::export_chunks(format, &enriched)?;

        info!(
            hash = %hash,
            rows,
            chunks = chunks.len(),
            extension = format.extension(),
            "Export complete, writing chunks"
        );

        // All chunk writes complete before the marker claims the dataset.
        self.store
            .write_chunks(&hash, chunks, format.extension())
            .await?;
        self.store.write_marker(&hash).await?;

        info!(hash = %hash, rows, "Ingestion completed");

        Ok(IngestOutcome::Completed { hash, rows })
    }
}
