//! Schema-flexible decoding of stored note records.
//!
//! Records accumulated under several write-time shapes. The detections may
//! sit under `Detections` as
//!
//! - a full OCR response object: `{"TextDetections": [...]}`,
//! - a bare list of detections,
//! - a JSON *string* holding either of the above,
//!
//! or be missing altogether. [`decode_record`] accepts all of them and
//! skips individual entries that lack a text or a numeric confidence, so
//! one odd record never hides the rest of the corpus.

use serde::Deserialize;
use serde_json::Value;

use crate::models::Detection;

/// Which historical shape a record's detections were found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `Detections` is an OCR response object with `TextDetections`.
    OcrResponse,
    /// `Detections` is a plain list of detections.
    DetectionList,
    /// `Detections` is a string containing JSON of one of the shapes above.
    Encoded,
    /// No `Detections` field (or `null`).
    Missing,
    /// `Detections` is present but in no known shape.
    Unrecognized,
}

/// Detections recovered from one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub shape: RecordShape,
    pub detections: Vec<Detection>,
    /// Entries present in the payload that could not be read as a detection.
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsField {
    Response {
        #[serde(rename = "TextDetections")]
        text_detections: Vec<Value>,
    },
    List(Vec<Value>),
    Encoded(String),
}

/// Extracts every readable detection from a record document.
pub fn decode_record(doc: &Value) -> DecodedRecord {
    let field = doc.get("Detections").or_else(|| doc.get("detections"));
    let field = match field {
        None | Some(Value::Null) => return empty(RecordShape::Missing),
        Some(v) => v,
    };

    match DetectionsField::deserialize(field) {
        Ok(DetectionsField::Response { text_detections }) => {
            read_entries(RecordShape::OcrResponse, text_detections)
        }
        Ok(DetectionsField::List(entries)) => read_entries(RecordShape::DetectionList, entries),
        Ok(DetectionsField::Encoded(raw)) => decode_encoded(&raw),
        Err(_) => empty(RecordShape::Unrecognized),
    }
}

fn decode_encoded(raw: &str) -> DecodedRecord {
    let inner: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return empty(RecordShape::Unrecognized),
    };
    // Only one level of encoding is accepted.
    match DetectionsField::deserialize(&inner) {
        Ok(DetectionsField::Response { text_detections }) => {
            read_entries(RecordShape::Encoded, text_detections)
        }
        Ok(DetectionsField::List(entries)) => read_entries(RecordShape::Encoded, entries),
        _ => empty(RecordShape::Unrecognized),
    }
}

fn read_entries(shape: RecordShape, entries: Vec<Value>) -> DecodedRecord {
    let total = entries.len();
    let detections: Vec<Detection> = entries
        .into_iter()
        .filter_map(|e| serde_json::from_value::<Detection>(e).ok())
        .collect();
    DecodedRecord {
        shape,
        skipped: total - detections.len(),
        detections,
    }
}

fn empty(shape: RecordShape) -> DecodedRecord {
    DecodedRecord {
        shape,
        detections: Vec::new(),
        skipped: 0,
    }
}
