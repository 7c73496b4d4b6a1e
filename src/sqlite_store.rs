//! SQLite-backed [`RecordStore`] implementation.
//!
//! Records live in the `notes` table created by [`crate::migrate`]. Scans
//! page through the table by primary key so large corpora are read in
//! bounded batches, but callers always receive the complete table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use noteless_core::store::{RecordStore, StoredRecord};

/// Rows fetched per scan page.
const SCAN_PAGE_SIZE: i64 = 500;

/// SQLite implementation of the [`RecordStore`] trait.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    page_size: i64,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            page_size: SCAN_PAGE_SIZE,
        }
    }

    /// Override the scan page size.
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, key: &str, record: &serde_json::Value) -> Result<()> {
        let document = serde_json::to_string(record)?;
        sqlx::query("INSERT INTO notes (snapid, document, created_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(&document)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert note record {}", key))?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let rows = sqlx::query(
                "SELECT snapid, document FROM notes \
                 WHERE ?1 IS NULL OR snapid > ?1 \
                 ORDER BY snapid ASC LIMIT ?2",
            )
            .bind(&after)
            .bind(self.page_size)
            .fetch_all(&self.pool)
            .await
            .context("Failed to scan note records")?;

            let page_len = rows.len() as i64;
            for row in rows {
                records.push(StoredRecord {
                    key: row.get("snapid"),
                    body: row.get("document"),
                });
            }

            match records.last() {
                Some(last) if page_len == self.page_size => after = Some(last.key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }
}
