//! Postcode geo resolution
//!
//! Maps raw "AREA SECTOR" postcodes to coordinates through [`GeoCache`], a
//! caching and retrying wrapper over a tabular [`PostcodeStore`]. Lookup
//! failures degrade to "no geo data" rather than aborting ingestion.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::pricepaid::models::GeoPoint;

/// Bounded attempts against the underlying store before degrading to None
const LOOKUP_ATTEMPTS: u32 = 3;

/// Raw coordinates as stored for a postcode; either component may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PostcodeRecord {
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

/// Tabular key-value postcode lookup, keyed by (area, sector)
#[async_trait]
pub trait PostcodeStore: Send + Sync {
    /// Fetch the record for an area/sector pair, or None when the postcode
    /// is not in the store.
    async fn find(&self, area: &str, sector: &str) -> Result<Option<PostcodeRecord>>;
}

/// Postgres-backed postcode store
#[derive(Clone)]
pub struct PgPostcodeStore {
    pool: PgPool,
}

impl PgPostcodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostcodeStore for PgPostcodeStore {
    async fn find(&self, area: &str, sector: &str) -> Result<Option<PostcodeRecord>> {
        let row: Option<(Option<f64>, Option<f64>)> =
            sqlx::query_as("SELECT lat, long FROM postcodes WHERE area = $1 AND sector = $2")
                .bind(area)
                .bind(sector)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(lat, long)| PostcodeRecord { lat, long }))
    }
}

/// Caching, retrying postcode resolver.
///
/// Outcomes (including "not found") are memoized for the cache lifetime,
/// keyed by the exact postcode string as supplied; callers wanting uniform
/// casing normalize before calling. Concurrent lookups are safe; two tasks
/// racing on the same cold key may both hit the store, and the second
/// insert simply overwrites the first with an identical value.
pub struct GeoCache<S> {
    store: S,
    entries: RwLock<HashMap<String, Option<GeoPoint>>>,
}

impl<S: PostcodeStore> GeoCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a postcode to a geo point.
    ///
    /// Returns None when the postcode is malformed (not exactly two
    /// whitespace-separated parts), absent from the store, resolves to an
    /// unusable coordinate, or every attempt against the store errored.
    pub async fn lookup(&self, postcode: &str) -> Option<GeoPoint> {
        if let Ok(entries) = self.entries.read() {
            if let Some(cached) = entries.get(postcode) {
                return *cached;
            }
        }

        // The read guard is dropped before any await; a stampede on a cold
        // key duplicates store lookups but never corrupts the map.
        let resolved = self.resolve(postcode).await;

        if let Ok(mut entries) = self.entries.write() {
            entries.insert(postcode.to_string(), resolved);
        }

        resolved
    }

    async fn resolve(&self, postcode: &str) -> Option<GeoPoint> {
        let parts: Vec<&str> = postcode.split_whitespace().collect();
        if parts.len() != 2 {
            return None;
        }
        let (area, sector) = (parts[0], parts[1]);

        for attempt in 1..=LOOKUP_ATTEMPTS {
            match self.store.find(area, sector).await {
                Ok(Some(record)) => return GeoPoint::new(record.lat?, record.long?),
                Ok(None) => return None,
                Err(e) => {
                    warn!(
                        postcode = %postcode,
                        attempt,
                        error = %e,
                        "Postcode lookup failed"
                    );
                }
            }
        }

        warn!(
            postcode = %postcode,
            attempts = LOOKUP_ATTEMPTS,
            "Postcode lookup exhausted retries, treating as no geo data"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Store double that replays a scripted sequence of responses and
    /// counts how often it was queried.
    struct ScriptedStore {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<Option<PostcodeRecord>>>>,
    }

    impl ScriptedStore {
        fn new(script: Vec<Result<Option<PostcodeRecord>>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PostcodeStore for Arc<ScriptedStore> {
        async fn find(&self, _area: &str, _sector: &str) -> Result<Option<PostcodeRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted store ran out of responses")
        }
    }

    fn record(lat: f64, long: f64) -> Result<Option<PostcodeRecord>> {
        Ok(Some(PostcodeRecord {
            lat: Some(lat),
            long: Some(long),
        }))
    }

    #[tokio::test]
    async fn test_lookup_is_memoized() {
        let store = ScriptedStore::new(vec![record(51.501, -0.141)]);
        let cache = GeoCache::new(Arc::clone(&store));

        let first = cache.lookup("SW1A 1AA").await;
        let second = cache.lookup("SW1A 1AA").await;

        assert_eq!(first, GeoPoint::new(51.501, -0.141));
        assert_eq!(first, second);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_memoized_too() {
        let store = ScriptedStore::new(vec![Ok(None)]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("ZZ9 9ZZ").await, None);
        assert_eq!(cache.lookup("ZZ9 9ZZ").await, None);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_postcode_skips_store() {
        let store = ScriptedStore::new(vec![]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("SW1A").await, None);
        assert_eq!(cache.lookup("SW1A 1AA EXTRA").await, None);
        assert_eq!(cache.lookup("").await, None);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let store = ScriptedStore::new(vec![
            Err(anyhow!("connection reset")),
            Err(anyhow!("connection reset")),
            record(53.48, -2.24),
        ]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("M1 2AB").await, GeoPoint::new(53.48, -2.24));
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade_to_none() {
        let store = ScriptedStore::new(vec![
            Err(anyhow!("boom")),
            Err(anyhow!("boom")),
            Err(anyhow!("boom")),
        ]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("M1 2AB").await, None);
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_unusable_coordinates_yield_none() {
        // (0, 0) is the store's missing-data sentinel; out-of-range
        // latitudes are bad rows. Both degrade to "no geo data".
        let store = ScriptedStore::new(vec![record(0.0, 0.0), record(91.0, 0.0)]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("AA1 1AA").await, None);
        assert_eq!(cache.lookup("BB2 2BB").await, None);
    }

    #[tokio::test]
    async fn test_missing_component_yields_none() {
        let store = ScriptedStore::new(vec![Ok(Some(PostcodeRecord {
            lat: Some(51.5),
            long: None,
        }))]);
        let cache = GeoCache::new(Arc::clone(&store));

        assert_eq!(cache.lookup("SW1A 1AA").await, None);
    }

    #[tokio::test]
    async fn test_cache_keyed_by_exact_string() {
        let store = ScriptedStore::new(vec![record(51.5, -0.1), record(51.5, -0.1)]);
        let cache = GeoCache::new(Arc::clone(&store));

        cache.lookup("SW1A 1AA").await;
        cache.lookup("sw1a 1aa").await;
        // No normalization before caching: distinct spellings are distinct keys.
        assert_eq!(store.calls(), 2);
    }
}
