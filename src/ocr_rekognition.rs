//! AWS Rekognition `DetectText` detector.
//!
//! Sends the image inline as base64 to the Rekognition JSON API, signed with
//! SigV4 (service `rekognition`). Every returned text detection, lines and
//! words alike, becomes a [`Detection`] with its geometry kept as-is.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

use noteless_core::models::Detection;
use noteless_core::ocr::TextDetector;

use crate::config::OcrConfig;
use crate::sigv4::{self, AwsCredentials, SigningRequest};

const TARGET: &str = "RekognitionService.DetectText";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

pub struct RekognitionDetector {
    region: String,
    scheme: String,
    host: String,
    creds: AwsCredentials,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct DetectTextResponse {
    #[serde(rename = "TextDetections", default)]
    text_detections: Vec<Detection>,
}

impl RekognitionDetector {
    /// Build a detector from config, reading credentials from the environment.
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let creds = AwsCredentials::from_env()?;
        Ok(Self::new(
            config.region.clone(),
            config.endpoint_url.as_deref(),
            creds,
        ))
    }

    pub fn new(region: String, endpoint_url: Option<&str>, creds: AwsCredentials) -> Self {
        let (scheme, host) = match endpoint_url {
            Some(url) => match url.split_once("://") {
                Some((scheme, rest)) => (scheme.to_string(), rest.trim_end_matches('/').to_string()),
                None => ("https".to_string(), url.trim_end_matches('/').to_string()),
            },
            None => (
                "https".to_string(),
                format!("rekognition.{}.amazonaws.com", region),
            ),
        };
        Self {
            region,
            scheme,
            host,
            creds,
            client: reqwest::Client::new(),
        }
    }
}

/// Request body for `DetectText` with the image passed inline.
fn request_body(image: &[u8]) -> Result<Vec<u8>> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    Ok(serde_json::to_vec(&serde_json::json!({
        "Image": { "Bytes": encoded }
    }))?)
}

fn parse_response(body: &str) -> Result<Vec<Detection>> {
    let parsed: DetectTextResponse =
        serde_json::from_str(body).context("Failed to parse DetectText response")?;
    Ok(parsed.text_detections)
}

#[async_trait]
impl TextDetector for RekognitionDetector {
    fn name(&self) -> &str {
        "rekognition"
    }

    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>> {
        let body = request_body(image)?;
        let headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("x-amz-target".to_string(), TARGET.to_string()),
        ];
        let signed = sigv4::sign(
            &self.creds,
            &SigningRequest {
                method: "POST",
                host: &self.host,
                canonical_uri: "/",
                query: &[],
                headers: &headers,
                payload: &body,
                region: &self.region,
                service: "rekognition",
            },
            Utc::now(),
        );

        let req = self
            .client
            .post(format!("{}://{}/", self.scheme, self.host))
            .body(body);
        let resp = sigv4::apply(req, &signed)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to call Rekognition DetectText: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!(
                "Rekognition DetectText failed (HTTP {}): {}",
                status,
                text.chars().take(500).collect::<String>()
            );
        }

        parse_response(&resp.text().await?)
    }
}
