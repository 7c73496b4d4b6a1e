//! TOML configuration.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:9898"
//!
//! [records]
//! path = "./data/noteless.sqlite"
//!
//! [blobs]
//! backend = "filesystem"        # or "s3"
//! root = "./data/blobs"
//! # bucket = "noteless-data"    # s3 only
//! # region = "eu-west-1"
//! # endpoint_url = "http://localhost:9000"
//!
//! [ocr]
//! provider = "tesseract"        # or "rekognition"
//! binary = "tesseract"
//! language = "eng"
//! timeout_secs = 60
//!
//! [commands]
//! confidence_threshold = 90.0
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use noteless_core::rules::{RuleSet, DEFAULT_CONFIDENCE_THRESHOLD};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub records: RecordsConfig,
    pub blobs: BlobsConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9898".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordsConfig {
    /// SQLite database file holding note records.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobsConfig {
    #[serde(default = "default_blob_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_blob_backend() -> String {
    "filesystem".to_string()
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_provider")]
    pub provider: String,
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: default_ocr_provider(),
            binary: default_tesseract_binary(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_ocr_provider() -> String {
    "tesseract".to_string()
}
fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl CommandsConfig {
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::with_threshold(self.confidence_threshold)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate commands
    if let Err(e) = config.commands.rule_set().validate() {
        bail!("commands.confidence_threshold: {}", e);
    }

    // Validate blobs
    match config.blobs.backend.as_str() {
        "filesystem" => {
            if config.blobs.root.is_none() {
                bail!("blobs.root must be set when backend is 'filesystem'");
            }
        }
        "s3" => {
            if config.blobs.bucket.as_deref().unwrap_or("").is_empty() {
                bail!("blobs.bucket must be set when backend is 's3'");
            }
        }
        other => bail!(
            "Unknown blob backend: '{}'. Must be filesystem or s3.",
            other
        ),
    }

    // Validate OCR
    match config.ocr.provider.as_str() {
        "tesseract" | "rekognition" => {}
        other => bail!(
            "Unknown OCR provider: '{}'. Must be tesseract or rekognition.",
            other
        ),
    }
    if config.ocr.timeout_secs == 0 {
        bail!("ocr.timeout_secs must be > 0");
    }

    Ok(())
}
