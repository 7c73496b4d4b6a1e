//! Core data types for notes, detections and the wire envelopes around them.
//!
//! Field names on the serialized types follow the wire format clients and
//! stored records already use (`Image`, `Message`, `ImageBase64`,
//! `DetectedText`, ...), so they are renamed explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Blob-store prefix under which note images live.
pub const IMAGE_PREFIX: &str = "raw/";

/// Suffix appended to every note image key.
pub const IMAGE_SUFFIX: &str = ".png";

/// Data-URI prefix for thumbnails returned by the listing service.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Blob key for a note's image: `raw/<id>.png`.
pub fn image_key(id: &Uuid) -> String {
    format!("{}{}{}", IMAGE_PREFIX, id, IMAGE_SUFFIX)
}

/// Inverse of [`image_key`]. Returns `None` for keys that don't follow the shape.
pub fn note_id_from_image_key(key: &str) -> Option<Uuid> {
    let stem = key.strip_prefix(IMAGE_PREFIX)?.strip_suffix(IMAGE_SUFFIX)?;
    Uuid::parse_str(stem).ok()
}

/// One OCR finding.
///
/// `geometry` is carried through untouched; nothing in the pipeline
/// interprets it. The serde names match the OCR response shape stored in
/// note records, with lower-case aliases accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "DetectedText", alias = "text")]
    pub text: String,
    /// Recognition confidence in `[0, 100]`.
    #[serde(rename = "Confidence", alias = "confidence")]
    pub confidence: f64,
    #[serde(
        rename = "Geometry",
        alias = "geometry",
        default,
        skip_serializing_if = "serde_json::Value::is_null"
    )]
    pub geometry: serde_json::Value,
}

impl Detection {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            geometry: serde_json::Value::Null,
        }
    }

    pub fn with_geometry(mut self, geometry: serde_json::Value) -> Self {
        self.geometry = geometry;
        self
    }
}

/// The OCR payload nested under `Detections` in a note record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionPayload {
    #[serde(rename = "TextDetections")]
    pub text_detections: Vec<Detection>,
}

/// Record written to the record store for every created note.
///
/// Keyed by `snapid`; the same id names the note's image blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub snapid: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "Detections")]
    pub detections: DetectionPayload,
}

impl NoteRecord {
    pub fn new(id: Uuid, detections: Vec<Detection>) -> Self {
        Self {
            snapid: id,
            created_at: Utc::now(),
            detections: DetectionPayload {
                text_detections: detections,
            },
        }
    }

    /// Serializes the record into the generic document handed to the record store.
    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Client intake request: a single base64-encoded image.
#[derive(Debug, Clone, Deserialize)]
pub struct Snap {
    #[serde(rename = "Image")]
    pub image: String,
}

/// Client intake response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeResponse {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Result of one intake request.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// OCR found nothing; no note was stored.
    NoText,
    /// A note was stored under `id`.
    Created {
        id: Uuid,
        image_ref: String,
        fragment_count: usize,
    },
}

/// Message returned when a snap yields no detections.
pub const NO_TEXT_MESSAGE: &str =
    "We were not able to detect any text in the snap provided, so no note was created.";

impl IntakeOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, IntakeOutcome::Created { .. })
    }

    pub fn note_id(&self) -> Option<Uuid> {
        match self {
            IntakeOutcome::Created { id, .. } => Some(*id),
            IntakeOutcome::NoText => None,
        }
    }

    /// User-facing message; for created notes it links to the notes page.
    pub fn message(&self) -> String {
        match self {
            IntakeOutcome::NoText => NO_TEXT_MESSAGE.to_string(),
            IntakeOutcome::Created {
                id, fragment_count, ..
            } => format!(
                "Found {} fragments, see <a href=\"../notes/\">note {}</a>.",
                fragment_count, id
            ),
        }
    }

    pub fn to_response(&self) -> IntakeResponse {
        IntakeResponse {
            message: self.message(),
        }
    }
}

/// One entry of the notes listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteThumbnail {
    #[serde(rename = "ImageBase64")]
    pub image_base64: String,
}

impl NoteThumbnail {
    /// Builds a thumbnail from already base64-encoded PNG bytes.
    pub fn from_encoded_png(encoded: &str) -> Self {
        Self {
            image_base64: format!("{}{}", PNG_DATA_URI_PREFIX, encoded),
        }
    }

    /// The base64 payload without the data-URI prefix.
    pub fn payload(&self) -> &str {
        self.image_base64
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .unwrap_or(&self.image_base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_key_shape() {
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        assert_eq!(
            image_key(&id),
            "raw/0f8fad5b-d9cb-469f-a165-70867728950e.png"
        );
        assert_eq!(note_id_from_image_key(&image_key(&id)), Some(id));
    }

    #[test]
    fn test_note_id_from_foreign_keys() {
        assert_eq!(note_id_from_image_key("raw/not-a-uuid.png"), None);
        assert_eq!(note_id_from_image_key("thumbs/x.png"), None);
        assert_eq!(
            note_id_from_image_key("raw/0f8fad5b-d9cb-469f-a165-70867728950e.jpg"),
            None
        );
    }

    #[test]
    fn test_record_document_shape() {
        let id = Uuid::new_v4();
        let record = NoteRecord::new(
            id,
            vec![Detection::new("GO", 97.5).with_geometry(json!({"BoundingBox": {"Left": 0.1}}))],
        );
        let doc = record.to_document().unwrap();
        assert_eq!(doc["snapid"], json!(id.to_string()));
        assert_eq!(doc["Detections"]["TextDetections"][0]["DetectedText"], "GO");
        assert_eq!(doc["Detections"]["TextDetections"][0]["Confidence"], 97.5);
        assert_eq!(
            doc["Detections"]["TextDetections"][0]["Geometry"]["BoundingBox"]["Left"],
            0.1
        );
        assert!(doc["created_at"].is_string());
    }

    #[test]
    fn test_detection_without_geometry_omits_field() {
        let doc = serde_json::to_value(Detection::new("up", 91.0)).unwrap();
        assert!(doc.get("Geometry").is_none());
    }

    #[test]
    fn test_detection_accepts_lowercase_aliases() {
        let d: Detection = serde_json::from_value(json!({"text": "left", "confidence": 93.2})).unwrap();
        assert_eq!(d, Detection::new("left", 93.2));
    }

    #[test]
    fn test_snap_envelope() {
        let snap: Snap = serde_json::from_str(r#"{"Image": "aGVsbG8="}"#).unwrap();
        assert_eq!(snap.image, "aGVsbG8=");
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(IntakeOutcome::NoText.message(), NO_TEXT_MESSAGE);
        assert!(!IntakeOutcome::NoText.is_created());

        let id = Uuid::new_v4();
        let created = IntakeOutcome::Created {
            id,
            image_ref: image_key(&id),
            fragment_count: 7,
        };
        let msg = created.message();
        assert!(msg.contains("Found 7 fragments"));
        assert!(msg.contains(&id.to_string()));
        assert_eq!(created.note_id(), Some(id));
    }

    #[test]
    fn test_response_wire_names() {
        let body = serde_json::to_value(IntakeOutcome::NoText.to_response()).unwrap();
        assert_eq!(body, json!({ "Message": NO_TEXT_MESSAGE }));

        let thumb = NoteThumbnail::from_encoded_png("iVBORw0KGgo=");
        let body = serde_json::to_value(&thumb).unwrap();
        assert_eq!(
            body,
            json!({ "ImageBase64": "data:image/png;base64,iVBORw0KGgo=" })
        );
        assert_eq!(thumb.payload(), "iVBORw0KGgo=");
    }
}
