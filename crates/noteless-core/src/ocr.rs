//! Text-detection abstraction.
//!
//! The [`TextDetector`] trait is the boundary to the OCR engine. Concrete
//! detectors (Tesseract, AWS Rekognition) live in the `noteless` app crate.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Detection;

/// An OCR engine that turns image bytes into text detections.
///
/// Implementations must return detections in the engine's own order and
/// must not filter or re-normalize confidences. An empty vector is a valid
/// answer for images without legible text.
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Short identifier used in logs (e.g. `"tesseract"`).
    fn name(&self) -> &str;

    /// Detect text in an encoded image.
    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>>;
}
