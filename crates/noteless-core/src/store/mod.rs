//! Storage abstraction for notes.
//!
//! A note lives in two places: its image in a [`BlobStore`] and its
//! detections in a [`RecordStore`]. The two are joined only by the note id
//! (`raw/<id>.png` ↔ `<id>`); nothing enforces that both exist.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

/// Key/value store for image bytes.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put`](BlobStore::put) | Write bytes under a key, returning a reference URI |
/// | [`list`](BlobStore::list) | All keys starting with a prefix, following pagination |
/// | [`get`](BlobStore::get) | Read the bytes stored under a key |
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any previous value.
    ///
    /// Returns a human-readable reference to the stored object
    /// (e.g. `s3://bucket/raw/<id>.png`).
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;

    /// List every key under `prefix`, in the store's native order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// A raw record as returned by [`RecordStore::scan`].
///
/// The body is left undecoded so callers can decide how to treat records
/// that are not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub body: String,
}

/// Table of note records keyed by note id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record under `key`. Fails if the key already exists.
    async fn put(&self, key: &str, record: &serde_json::Value) -> Result<()>;

    /// Return every record in the table. Backends that page internally
    /// must follow all pages before returning.
    async fn scan(&self) -> Result<Vec<StoredRecord>>;
}
