//! In-memory [`BlobStore`] and [`RecordStore`] implementations for tests
//! and ephemeral runs.
//!
//! Both use `BTreeMap` behind `std::sync::RwLock`, so listing and scanning
//! return keys in sorted order.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{BlobStore, RecordStore, StoredRecord};

/// In-memory blob store.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(format!("memory://{}", key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;
        Ok(blobs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| anyhow!("blob store lock poisoned"))?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("blob not found: {}", key))
    }
}

/// In-memory record store.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<String, String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a record body verbatim, bypassing JSON serialization.
    ///
    /// Lets callers seed records written under older or broken schemas.
    pub fn insert_raw(&self, key: impl Into<String>, body: impl Into<String>) {
        if let Ok(mut records) = self.records.write() {
            records.insert(key.into(), body.into());
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, key: &str, record: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_string(record)?;
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        if records.contains_key(key) {
            bail!("record already exists: {}", key);
        }
        records.insert(key.to_string(), body);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StoredRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        Ok(records
            .iter()
            .map(|(key, body)| StoredRecord {
                key: key.clone(),
                body: body.clone(),
            })
            .collect())
    }
}
