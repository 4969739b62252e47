//! Dataset artifact store
//!
//! Naming and persistence of ingestion artifacts in the properties
//! container: exported chunks (`<hash>-part-<index>.<ext>`) and the
//! zero-byte hash markers (`hash-<hash>.txt`) whose presence is the single
//! source of truth for "this dataset was fully ingested". Markers are
//! written only after every chunk write has completed, and are never
//! deleted by this subsystem.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use tracing::debug;

use crate::storage::ObjectStore;

/// Object-name prefix reserved for hash markers
pub const HASH_MARKER_PREFIX: &str = "hash-";

/// Deterministic chunk object name
pub fn chunk_name(hash: &str, index: usize, extension: &str) -> String {
    format!("{}-part-{}.{}", hash, index, extension)
}

/// Deterministic marker object name
pub fn marker_name(hash: &str) -> String {
    format!("{}{}.txt", HASH_MARKER_PREFIX, hash)
}

/// Thin, stateless façade over object storage for dataset artifacts
pub struct DatasetStore<O> {
    store: Arc<O>,
}

impl<O: ObjectStore> DatasetStore<O> {
    pub fn new(store: Arc<O>) -> Self {
        Self { store }
    }

    /// Hashes of every dataset already fully ingested.
    ///
    /// Queried fresh on every call; the marker set can grow between
    /// scheduled runs.
    pub async fn ingested_hashes(&self) -> Result<HashSet<String>> {
        let names = self
            .store
            .list(HASH_MARKER_PREFIX)
            .await
            .context("Failed to list hash markers")?;

        Ok(names
            .iter()
            .filter_map(|name| {
                let rest = name.strip_prefix(HASH_MARKER_PREFIX)?;
                Some(rest.split('.').next().unwrap_or(rest).to_string())
            })
            .collect())
    }

    /// Write every chunk for a dataset as one jointly-awaited step.
    ///
    /// Chunk `index` in the input becomes object `<hash>-part-<index>`;
    /// naming is derived from row position, never completion order.
    pub async fn write_chunks(
        &self,
        hash: &str,
        chunks: Vec<String>,
        extension: &str,
    ) -> Result<()> {
        let total = chunks.len();

        let writes = chunks.into_iter().enumerate().map(|(index, chunk)| {
            let name = chunk_name(hash, index, extension);
            let store = Arc::clone(&self.store);
            async move { store.put(&name, chunk.into_bytes()).await }
        });

        try_join_all(writes)
            .await
            .context("Failed to write dataset chunks")?;

        debug!(hash = %hash, chunks = total, "All chunks written");
        Ok(())
    }

    /// Record a dataset as fully ingested.
    ///
    /// Only called after [`write_chunks`](Self::write_chunks) has returned;
    /// a marker must never exist ahead of its data.
    pub async fn write_marker(&self, hash: &str) -> Result<()> {
        self.store
            .put(&marker_name(hash), Vec::new())
            .await
            .with_context(|| format!("Failed to write hash marker for {}", hash))
    }
}
