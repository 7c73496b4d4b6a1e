//! Intake pipeline: snap → OCR → image blob → note record.
//!
//! One request performs at most one OCR call, one blob write and one record
//! write, in that order, with no reads and no retries. Both writes use the
//! same freshly generated id. If the record write fails after the blob write
//! succeeded, the blob is left in place and logged; `noteless audit` reports
//! such orphans.

use std::sync::Arc;

use base64::Engine;
use tracing::{debug, info, warn};
use uuid::Uuid;

use noteless_core::models::{image_key, IntakeOutcome, NoteRecord, Snap};
use noteless_core::ocr::TextDetector;
use noteless_core::store::{BlobStore, RecordStore};
use noteless_core::{NoteError, Result};

pub struct IntakePipeline {
    detector: Arc<dyn TextDetector>,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
}

impl IntakePipeline {
    pub fn new(
        detector: Arc<dyn TextDetector>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            detector,
            blobs,
            records,
        }
    }

    /// Handle a raw HTTP body holding a `{"Image": "<base64>"}` envelope.
    pub async fn intake_json(&self, body: &str) -> Result<IntakeOutcome> {
        let snap: Snap =
            serde_json::from_str(body).map_err(|e| NoteError::Decode(e.to_string()))?;
        self.intake(&snap.image).await
    }

    /// Handle a base64-encoded image (standard alphabet, padded).
    ///
    /// Line breaks are ignored; any other character outside the alphabet
    /// rejects the whole image.
    pub async fn intake(&self, encoded_image: &str) -> Result<IntakeOutcome> {
        let unwrapped: String = encoded_image
            .chars()
            .filter(|c| !matches!(c, '\r' | '\n'))
            .collect();
        let image = base64::engine::general_purpose::STANDARD
            .decode(unwrapped)
            .map_err(|e| NoteError::Decode(e.to_string()))?;
        self.intake_image(&image).await
    }

    /// Handle already-decoded image bytes.
    pub async fn intake_image(&self, image: &[u8]) -> Result<IntakeOutcome> {
        debug!(bytes = image.len(), ocr = self.detector.name(), "detecting text");

        let detections = self
            .detector
            .detect(image)
            .await
            .map_err(|e| NoteError::Ocr(format!("{:#}", e)))?;

        if detections.is_empty() {
            info!("no text detected, no note created");
            return Ok(IntakeOutcome::NoText);
        }
        let fragment_count = detections.len();

        let id = Uuid::new_v4();
        let key = image_key(&id);
        let image_ref = self
            .blobs
            .put(&key, image)
            .await
            .map_err(|e| NoteError::storage("Can't store image", e))?;
        debug!(%id, %image_ref, "image stored");

        let record = NoteRecord::new(id, detections);
        let document = record
            .to_document()
            .map_err(|e| NoteError::Storage(format!("Can't serialize note record: {}", e)))?;

        if let Err(e) = self.records.put(&id.to_string(), &document).await {
            warn!(%id, blob = %key, error = %format!("{:#}", e), "record write failed, image blob left orphaned");
            return Err(NoteError::storage("Can't store note record", e));
        }

        info!(%id, fragments = fragment_count, %image_ref, "note created");
        Ok(IntakeOutcome::Created {
            id,
            image_ref,
            fragment_count,
        })
    }
}
