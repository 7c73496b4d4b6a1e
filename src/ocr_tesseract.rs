//! Tesseract OCR detector.
//!
//! Pipes the image into `tesseract stdin stdout -l <lang> tsv` and turns the
//! word-level TSV rows into [`Detection`]s. Requires the `tesseract` binary
//! on the host (or at the configured path).

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use noteless_core::models::Detection;
use noteless_core::ocr::TextDetector;

use crate::config::OcrConfig;

/// TSV `level` value for word rows.
const WORD_LEVEL: u32 = 5;

pub struct TesseractDetector {
    binary: String,
    language: String,
    timeout: Duration,
}

impl TesseractDetector {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl TextDetector for TesseractDetector {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str(), "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run {}", self.binary))?;

        let mut stdin = child
            .stdin
            .take()
            .context("tesseract stdin was not captured")?;
        let input = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to wait for {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} failed (exit {}): {}",
                self.binary,
                output.status,
                stderr.chars().take(500).collect::<String>()
            );
        }

        let _ = writer.await;

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse Tesseract TSV output into word detections.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Only word rows with a non-negative confidence
/// and non-blank text are kept.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Detection>> {
    let mut lines = tsv.lines();
    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        Some(_) => bail!("unexpected tesseract TSV header"),
        None => return Ok(Vec::new()),
    }

    let mut detections = Vec::new();
    for line in lines {
        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].parse::<u32>().ok() != Some(WORD_LEVEL) {
            continue;
        }
        let Ok(confidence) = cols[10].trim().parse::<f64>() else {
            continue;
        };
        let text = cols[11].trim();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }

        let px = |i: usize| cols[i].trim().parse::<i64>().unwrap_or(0);
        detections.push(Detection::new(text, confidence).with_geometry(json!({
            "BoundingBox": {
                "Left": px(6),
                "Top": px(7),
                "Width": px(8),
                "Height": px(9),
            }
        })));
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t
2\t1\t1\t0\t0\t0\t36\t92\t200\t40\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t60\t40\t96.063751\tGO
5\t1\t1\t1\t1\t2\t110\t92\t70\t40\t88.5\tleft
5\t1\t1\t1\t1\t3\t190\t92\t10\t40\t-1\t
5\t1\t1\t1\t1\t4\t210\t92\t10\t40\t12\t
";

    #[test]
    fn test_parse_word_rows() {
        let dets = parse_tsv(SAMPLE).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].text, "GO");
        assert!((dets[0].confidence - 96.063751).abs() < 1e-9);
        assert_eq!(dets[0].geometry["BoundingBox"]["Left"], 36);
        assert_eq!(dets[0].geometry["BoundingBox"]["Width"], 60);
        assert_eq!(dets[1].text, "left");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_tsv("").unwrap().is_empty());
        assert!(parse_tsv("level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rejects_non_tsv_output() {
        assert!(parse_tsv("Error opening data file").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let detector = TesseractDetector::new(&OcrConfig {
            binary: "/nonexistent/tesseract-noteless".to_string(),
            ..OcrConfig::default()
        });
        let err = detector.detect(b"\x89PNG").await.unwrap_err();
        assert!(err.to_string().contains("tesseract-noteless"));
    }
}
