//! Row enrichment
//!
//! Transforms the raw dataset payload into enriched transactions. The whole
//! payload is parsed eagerly (a monthly snapshot fits in memory), then geo
//! resolution fans out in bounded concurrent batches so that peak in-flight
//! postcode lookups stay capped while network latency still overlaps within
//! a batch. Output order matches input order exactly.

use std::collections::HashSet;

use anyhow::{bail, Result};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::models::EnrichedTransaction;
use super::parser;
use crate::geo::{GeoCache, PostcodeStore};

/// Rows resolved concurrently per batch
pub const ENRICH_BATCH_SIZE: usize = 500;

/// Progress is logged every this many processed rows
const PROGRESS_INTERVAL: usize = 5_000;

/// Batch-wise geo enrichment over a [`GeoCache`]
pub struct RowEnricher<'a, S> {
    geo: &'a GeoCache<S>,
    batch_size: usize,
}

impl<'a, S: PostcodeStore> RowEnricher<'a, S> {
    pub fn new(geo: &'a GeoCache<S>) -> Self {
        Self {
            geo,
            batch_size: ENRICH_BATCH_SIZE,
        }
    }

    /// Override the batch size (smaller batches in tests)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Parse the payload and resolve a geo point per row.
    ///
    /// A malformed row fails the whole call before any lookup is made.
    /// Cancellation is observed between batches; a cancelled call returns
    /// an error without producing partial output.
    pub async fn enrich(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedTransaction>> {
        let transactions = parser::parse_transactions(payload)?;
        let total = transactions.len();

        let with_postcode = transactions
            .iter()
            .filter(|t| t.postcode.is_some())
            .count();
        let unique_postcodes = transactions
            .iter()
            .filter_map(|t| t.postcode.as_deref())
            .collect::<HashSet<_>>()
            .len();

        info!(
            rows = total,
            with_postcode,
            unique_postcodes,
            "Parsed dataset, starting geo enrichment"
        );

        let mut enriched = Vec::with_capacity(total);
        let mut rows = transactions.into_iter();

        loop {
            let batch: Vec<_> = rows.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            if cancel.is_cancelled() {
                bail!("ingestion cancelled during enrichment");
            }

            let geos = join_all(batch.iter().map(|t| async move {
                match t.postcode.as_deref() {
                    Some(postcode) => self.geo.lookup(postcode).await,
                    None => None,
                }
            }))
            .await;

            for (transaction, geo) in batch.into_iter().zip(geos) {
                enriched.push(EnrichedTransaction { transaction, geo });
            }

            if enriched.len() % PROGRESS_INTERVAL == 0 {
                info!(
                    remaining = total - enriched.len(),
                    with_postcode,
                    unique_postcodes,
                    "Enrichment progress"
                );
            }
        }

        Ok(enriched)
    }
}
