//! Shared test doubles for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use pps_ingest::geo::{PostcodeRecord, PostcodeStore};
use pps_ingest::storage::ObjectStore;

/// In-memory object store standing in for the properties container
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, name: &str, body: Vec<u8>) -> Result<()> {
        self.objects.lock().unwrap().insert(name.to_string(), body);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Postcode store with a fixed set of resolvable postcodes
#[derive(Clone, Default)]
pub struct StaticPostcodeStore {
    rows: Arc<HashMap<(String, String), PostcodeRecord>>,
}

impl StaticPostcodeStore {
    /// Entries are given as full postcodes ("SW1A 1AA", lat, long)
    pub fn new(entries: &[(&str, f64, f64)]) -> Self {
        let rows = entries
            .iter()
            .filter_map(|(postcode, lat, long)| {
                let (area, sector) = postcode.split_once(' ')?;
                Some((
                    (area.to_string(), sector.to_string()),
                    PostcodeRecord {
                        lat: Some(*lat),
                        long: Some(*long),
                    },
                ))
            })
            .collect();

        Self {
            rows: Arc::new(rows),
        }
    }
}

#[async_trait]
impl PostcodeStore for StaticPostcodeStore {
    async fn find(&self, area: &str, sector: &str) -> Result<Option<PostcodeRecord>> {
        Ok(self
            .rows
            .get(&(area.to_string(), sector.to_string()))
            .copied())
    }
}
