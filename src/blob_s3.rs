//! Amazon S3 blob store.
//!
//! Stores note images in an S3 bucket (or any S3-compatible service such as
//! MinIO or LocalStack) using signed REST calls:
//!
//! - `PUT /<key>` to write an image
//! - `GET /<key>` to read it back
//! - `GET /?list-type=2` (ListObjectsV2) to enumerate keys, following
//!   continuation tokens until the listing is complete
//!
//! Requests are signed with [`crate::sigv4`] using credentials from the
//! standard `AWS_*` environment variables.
//!
//! # Addressing
//!
//! Without `endpoint_url`, requests go to
//! `https://<bucket>.s3.<region>.amazonaws.com` (virtual-hosted style).
//! With a custom endpoint, the endpoint's scheme is kept and the bucket is
//! placed in the path (`<endpoint>/<bucket>/<key>`), which is what local
//! S3-compatible services expect.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use noteless_core::store::BlobStore;

use crate::config::BlobsConfig;
use crate::sigv4::{self, AwsCredentials, SigningRequest};

/// Keys requested per ListObjectsV2 page.
const LIST_PAGE_SIZE: &str = "1000";

/// S3 implementation of the [`BlobStore`] trait.
pub struct S3BlobStore {
    bucket: String,
    region: String,
    endpoint: Endpoint,
    creds: AwsCredentials,
    client: reqwest::Client,
}

/// Where requests for the bucket are sent.
#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    scheme: String,
    host: String,
    /// Path prefix before the object key: empty for virtual-hosted
    /// addressing, `/<bucket>` for path-style.
    base_path: String,
}

impl Endpoint {
    fn resolve(bucket: &str, region: &str, endpoint_url: Option<&str>) -> Self {
        match endpoint_url {
            Some(url) => {
                let (scheme, rest) = match url.split_once("://") {
                    Some((scheme, rest)) => (scheme.to_string(), rest),
                    None => ("https".to_string(), url),
                };
                Self {
                    scheme,
                    host: rest.trim_end_matches('/').to_string(),
                    base_path: format!("/{}", sigv4::uri_encode(bucket)),
                }
            }
            None => Self {
                scheme: "https".to_string(),
                host: format!("{}.s3.{}.amazonaws.com", bucket, region),
                base_path: String::new(),
            },
        }
    }

    /// Canonical (and request) path for an object key.
    fn object_path(&self, key: &str) -> String {
        format!("{}/{}", self.base_path, sigv4::encode_key_path(key))
    }

    /// Canonical path for bucket-level operations such as listing.
    fn bucket_path(&self) -> String {
        format!("{}/", self.base_path)
    }

    fn url(&self, path: &str, query_string: &str) -> String {
        if query_string.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.host, path, query_string)
        }
    }
}

impl S3BlobStore {
    /// Build a store from config, reading credentials from the environment.
    pub fn from_config(config: &BlobsConfig) -> Result<Self> {
        let bucket = match config.bucket.as_deref() {
            Some(b) if !b.is_empty() => b.to_string(),
            _ => bail!("blobs.bucket must be set when backend is 's3'"),
        };
        let creds = AwsCredentials::from_env()?;
        Ok(Self::new(
            bucket,
            config.region.clone(),
            config.endpoint_url.as_deref(),
            creds,
        ))
    }

    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<&str>,
        creds: AwsCredentials,
    ) -> Self {
        let endpoint = Endpoint::resolve(&bucket, &region, endpoint_url);
        Self {
            bucket,
            region,
            endpoint,
            creds,
            client: reqwest::Client::new(),
        }
    }

    fn signed(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        payload: &[u8],
    ) -> sigv4::SignedRequest {
        sigv4::sign(
            &self.creds,
            &SigningRequest {
                method,
                host: &self.endpoint.host,
                canonical_uri: path,
                query,
                headers: &[],
                payload,
                region: &self.region,
                service: "s3",
            },
            Utc::now(),
        )
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.endpoint.object_path(key);
        let signed = self.signed("PUT", &path, &[], bytes);

        let req = self
            .client
            .put(self.endpoint.url(&path, &signed.query_string))
            .body(bytes.to_vec());
        let resp = sigv4::apply(req, &signed)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to put s3://{}/{}: {}", self.bucket, key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 PutObject failed (HTTP {}) for key '{}': {}",
                status,
                key,
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    /// List all keys under `prefix`, handling pagination.
    ///
    /// Uses `ListObjectsV2` with `max-keys=1000` per page and follows
    /// `NextContinuationToken` until all keys are retrieved.
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let path = self.endpoint.bucket_path();
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), LIST_PAGE_SIZE.to_string()),
            ];
            if !prefix.is_empty() {
                query.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(ref token) = continuation_token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let signed = self.signed("GET", &path, &query, b"");
            let req = self
                .client
                .get(self.endpoint.url(&path, &signed.query_string));
            let resp = sigv4::apply(req, &signed).send().await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to list S3 objects in s3://{}/{}: {}",
                    self.bucket,
                    prefix,
                    e
                )
            })?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "S3 ListObjectsV2 failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                );
            }

            let xml_body = resp.text().await?;
            let page = parse_list_objects_response(&xml_body);
            keys.extend(page.keys);

            match (page.is_truncated, page.next_token) {
                (true, Some(token)) => continuation_token = Some(token),
                (true, None) => bail!("S3 listing truncated without a continuation token"),
                (false, _) => break,
            }
        }

        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.endpoint.object_path(key);
        let signed = self.signed("GET", &path, &[], b"");

        let req = self
            .client
            .get(self.endpoint.url(&path, &signed.query_string));
        let resp = sigv4::apply(req, &signed)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get s3://{}/{}: {}", self.bucket, key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", status, key);
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

// ============ XML Parsing (minimal, no extra deps) ============

/// One page of a `ListObjectsV2` response.
#[derive(Debug, Default, PartialEq)]
struct ListPage {
    keys: Vec<String>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// Parse a `ListObjectsV2` XML response.
///
/// Directory placeholder keys (ending in `/`) are skipped.
fn parse_list_objects_response(xml: &str) -> ListPage {
    let mut page = ListPage {
        is_truncated: extract_xml_value(xml, "IsTruncated")
            .map(|v| v == "true")
            .unwrap_or(false),
        next_token: extract_xml_value(xml, "NextContinuationToken").map(|t| xml_unescape(&t)),
        ..Default::default()
    };

    let mut remaining = xml;
    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        let Some(end) = remaining[block_start..].find("</Contents>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];

        if let Some(key) = extract_xml_value(block, "Key") {
            let key = xml_unescape(&key);
            if !key.is_empty() && !key.ends_with('/') {
                page.keys.push(key);
            }
        }

        remaining = &remaining[block_start + end + "</Contents>".len()..];
    }

    page
}

/// Extract the text content of an XML tag (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
