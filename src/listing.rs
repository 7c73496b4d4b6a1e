//! Read side of the pipeline: rule text, note thumbnails and the command set.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine;
use tracing::{debug, warn};

use noteless_core::commands::extract_decoded;
use noteless_core::corpus::{decode_record, RecordShape};
use noteless_core::models::{NoteThumbnail, IMAGE_PREFIX};
use noteless_core::rules::RuleSet;
use noteless_core::store::{BlobStore, RecordStore};
use noteless_core::{NoteError, Result};

pub struct ListingService {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    rules: RuleSet,
}

impl ListingService {
    pub fn new(blobs: Arc<dyn BlobStore>, records: Arc<dyn RecordStore>, rules: RuleSet) -> Self {
        Self {
            blobs,
            records,
            rules,
        }
    }

    pub fn rules_text(&self) -> String {
        self.rules.render_text()
    }

    /// Every stored note image as a PNG data URI, in blob-store order.
    ///
    /// Any list or read failure fails the whole listing.
    pub async fn list_note_thumbnails(&self) -> Result<Vec<NoteThumbnail>> {
        let keys = self
            .blobs
            .list(IMAGE_PREFIX)
            .await
            .map_err(|e| NoteError::storage("Can't list note images", e))?;
        debug!(count = keys.len(), "listing note images");

        let mut thumbnails = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self
                .blobs
                .get(&key)
                .await
                .map_err(|e| NoteError::storage(&format!("Can't read {}", key), e))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            thumbnails.push(NoteThumbnail::from_encoded_png(&encoded));
        }
        Ok(thumbnails)
    }

    /// Commands found across every stored record.
    ///
    /// Records that are not JSON or whose detections are in no known shape
    /// are skipped with a warning. Unreadable entries inside an otherwise
    /// readable record are dropped and counted in a warning.
    pub async fn list_commands(&self) -> Result<BTreeSet<String>> {
        let stored = self
            .records
            .scan()
            .await
            .map_err(|e| NoteError::storage("Can't scan note records", e))?;

        let mut decoded = Vec::with_capacity(stored.len());
        for record in stored {
            let doc = match serde_json::from_str::<serde_json::Value>(&record.body) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(key = %record.key, error = %e, "skipping malformed note record");
                    continue;
                }
            };
            let entry = decode_record(&doc);
            if entry.shape == RecordShape::Unrecognized {
                warn!(key = %record.key, "skipping note record with unrecognized detections");
                continue;
            }
            if entry.skipped > 0 {
                warn!(
                    key = %record.key,
                    skipped = entry.skipped,
                    "skipping unreadable detections in note record"
                );
            }
            decoded.push(entry);
        }

        let commands = extract_decoded(&decoded, &self.rules)?;
        debug!(
            records = decoded.len(),
            commands = commands.len(),
            "commands extracted"
        );
        Ok(commands)
    }
}
