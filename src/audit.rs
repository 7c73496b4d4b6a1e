//! Orphan audit between the blob store and the record store.
//!
//! A note is complete when both `raw/<id>.png` and the record `<id>` exist.
//! Intake writes the blob first, so a failed record write leaves an orphan
//! blob; records without an image can appear after manual cleanup. The
//! audit only reports, it never repairs.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use noteless_core::models::{note_id_from_image_key, IMAGE_PREFIX};
use noteless_core::store::{BlobStore, RecordStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    /// Notes with both an image and a record.
    pub notes: usize,
    /// Image keys without a matching record.
    pub orphan_blobs: Vec<String>,
    /// Record keys without a matching image.
    pub orphan_records: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_blobs.is_empty() && self.orphan_records.is_empty()
    }
}

pub async fn audit(blobs: &dyn BlobStore, records: &dyn RecordStore) -> Result<AuditReport> {
    let blob_keys = blobs
        .list(IMAGE_PREFIX)
        .await
        .context("Failed to list note images")?;
    let record_keys: BTreeSet<String> = records
        .scan()
        .await
        .context("Failed to scan note records")?
        .into_iter()
        .map(|r| r.key)
        .collect();

    let mut report = AuditReport::default();
    let mut imaged = BTreeSet::new();

    for key in blob_keys {
        match note_id_from_image_key(&key).map(|id| id.to_string()) {
            Some(id) if record_keys.contains(&id) => {
                report.notes += 1;
                imaged.insert(id);
            }
            _ => {
                warn!(blob = %key, "orphan image blob");
                report.orphan_blobs.push(key);
            }
        }
    }

    for key in record_keys {
        if !imaged.contains(&key) {
            warn!(record = %key, "orphan note record");
            report.orphan_records.push(key);
        }
    }

    Ok(report)
}
