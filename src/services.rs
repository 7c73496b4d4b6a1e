//! Collaborator construction from configuration.
//!
//! Picks the blob backend and OCR provider named in the config, opens the
//! SQLite record store (running migrations), and hands back shared
//! `Arc<dyn Trait>` handles that the intake pipeline, listing service and
//! audit all borrow from.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use noteless_core::ocr::TextDetector;
use noteless_core::rules::RuleSet;
use noteless_core::store::{BlobStore, RecordStore};

use crate::blob_fs::FilesystemBlobStore;
use crate::blob_s3::S3BlobStore;
use crate::config::{BlobsConfig, Config, OcrConfig};
use crate::intake::IntakePipeline;
use crate::listing::ListingService;
use crate::ocr_rekognition::RekognitionDetector;
use crate::ocr_tesseract::TesseractDetector;
use crate::sqlite_store::SqliteRecordStore;
use crate::{db, migrate};

/// Shared handles to every collaborator.
#[derive(Clone)]
pub struct Services {
    pub detector: Arc<dyn TextDetector>,
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
    pub rules: RuleSet,
}

impl Services {
    /// Assemble services from already-built collaborators.
    pub fn new(
        detector: Arc<dyn TextDetector>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        rules: RuleSet,
    ) -> Self {
        Self {
            detector,
            blobs,
            records,
            rules,
        }
    }

    /// Build every collaborator named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.records).await?;
        migrate::run_migrations(&pool).await?;

        let blobs = build_blob_store(&config.blobs)?;
        let detector = build_detector(&config.ocr)?;
        info!(
            blobs = %config.blobs.backend,
            ocr = detector.name(),
            threshold = config.commands.confidence_threshold,
            "services ready"
        );

        Ok(Self::new(
            detector,
            blobs,
            Arc::new(SqliteRecordStore::new(pool)),
            config.commands.rule_set(),
        ))
    }

    pub fn intake(&self) -> IntakePipeline {
        IntakePipeline::new(
            self.detector.clone(),
            self.blobs.clone(),
            self.records.clone(),
        )
    }

    pub fn listing(&self) -> ListingService {
        ListingService::new(self.blobs.clone(), self.records.clone(), self.rules.clone())
    }
}

/// Create the record schema and, for the filesystem backend, the blob root.
/// Safe to run repeatedly.
pub async fn initialize(config: &Config) -> Result<()> {
    let pool = db::connect(&config.records).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;

    if let ("filesystem", Some(root)) = (config.blobs.backend.as_str(), config.blobs.root.as_ref()) {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create blob root {}", root.display()))?;
    }
    info!(records = %config.records.path.display(), "noteless initialized");
    Ok(())
}

pub fn build_blob_store(config: &BlobsConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend.as_str() {
        "filesystem" => match config.root {
            Some(ref root) => Ok(Arc::new(FilesystemBlobStore::new(root.clone()))),
            None => bail!("blobs.root must be set when backend is 'filesystem'"),
        },
        "s3" => Ok(Arc::new(S3BlobStore::from_config(config)?)),
        other => bail!("Unknown blob backend: '{}'", other),
    }
}

pub fn build_detector(config: &OcrConfig) -> Result<Arc<dyn TextDetector>> {
    match config.provider.as_str() {
        "tesseract" => Ok(Arc::new(TesseractDetector::new(config))),
        "rekognition" => Ok(Arc::new(RekognitionDetector::from_config(config)?)),
        other => bail!("Unknown OCR provider: '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordsConfig;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> Config {
        Config {
            server: Default::default(),
            records: RecordsConfig {
                path: tmp.path().join("notes.sqlite"),
            },
            blobs: BlobsConfig {
                backend: "filesystem".to_string(),
                root: Some(tmp.path().join("blobs")),
                bucket: None,
                region: "eu-west-1".to_string(),
                endpoint_url: None,
            },
            ocr: OcrConfig::default(),
            commands: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_from_config_builds_local_stack() {
        let tmp = TempDir::new().unwrap();
        let services = Services::from_config(&config(&tmp)).await.unwrap();
        assert_eq!(services.detector.name(), "tesseract");
        assert_eq!(services.rules.threshold(), 90.0);
        assert!(services.records.scan().await.unwrap().is_empty());
        assert!(tmp.path().join("notes.sqlite").exists());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        initialize(&cfg).await.unwrap();
        initialize(&cfg).await.unwrap();
        assert!(tmp.path().join("blobs").is_dir());
    }

    #[test]
    fn test_unknown_backends_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(&tmp);
        cfg.blobs.backend = "ftp".to_string();
        assert!(build_blob_store(&cfg.blobs).is_err());

        cfg.ocr.provider = "magic".to_string();
        assert!(build_detector(&cfg.ocr).is_err());
    }
}
