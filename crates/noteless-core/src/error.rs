//! Error taxonomy for the note pipeline.

use thiserror::Error;

/// Result type alias using [`NoteError`].
pub type Result<T> = std::result::Result<T, NoteError>;

/// Failure classes surfaced by intake, listing and command extraction.
///
/// Every variant is terminal for the request that produced it; nothing in
/// the pipeline retries.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Malformed client input: bad JSON envelope or bad base64.
    #[error("Can't decode snap: {0}")]
    Decode(String),

    /// The OCR adapter failed (network, quota, unreadable image).
    #[error("Can't detect text: {0}")]
    Ocr(String),

    /// A blob or record write, read, list or scan failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The rule set could not be evaluated.
    #[error("Command extraction failed: {0}")]
    Extraction(String),
}

impl NoteError {
    /// Machine-readable code used in logs and error responses.
    pub fn code(&self) -> &'static str {
        match self {
            NoteError::Decode(_) => "decode_error",
            NoteError::Ocr(_) => "ocr_error",
            NoteError::Storage(_) => "storage_error",
            NoteError::Extraction(_) => "extraction_error",
        }
    }

    /// Wraps a collaborator error as a storage failure, keeping its context chain.
    pub fn storage(context: &str, err: anyhow::Error) -> Self {
        NoteError::Storage(format!("{}: {:#}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_decode() {
        let err = NoteError::Decode("illegal base64 data at input byte 4".to_string());
        assert_eq!(
            err.to_string(),
            "Can't decode snap: illegal base64 data at input byte 4"
        );
    }

    #[test]
    fn test_error_display_ocr() {
        let err = NoteError::Ocr("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Can't detect text: quota exceeded");
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            NoteError::Decode(String::new()).code(),
            NoteError::Ocr(String::new()).code(),
            NoteError::Storage(String::new()).code(),
            NoteError::Extraction(String::new()).code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_storage_keeps_context_chain() {
        let inner = anyhow::anyhow!("disk full").context("write raw/abc.png");
        let err = NoteError::storage("Can't store note image", inner);
        let msg = err.to_string();
        assert!(msg.starts_with("Storage error: Can't store note image"));
        assert!(msg.contains("write raw/abc.png"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<NoteError>();
        assert_sync::<NoteError>();
    }
}
