//! Local filesystem blob store.
//!
//! Each key maps to a file under the configured root (`raw/<id>.png` →
//! `<root>/raw/<id>.png`). Writes go to a temporary sibling file that is
//! renamed into place, so readers never observe a partially written image.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

use noteless_core::store::BlobStore;

/// Suffix of in-flight writes; such files are never listed.
const TEMP_SUFFIX: &str = ".tmp";

pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, rejecting keys that would
    /// escape it.
    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("invalid blob key: {:?}", key);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let full_path = self.full_path(key)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob_fs: create_dir_all failed");
                anyhow::anyhow!("Failed to create directory {}: {}", parent.display(), e)
            })?;
        }

        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob_fs: rename failed");
            anyhow::anyhow!("Failed to move blob into place at {}: {}", full_path.display(), e)
        })?;

        Ok(format!("file://{}", full_path.display()))
    }

    /// List keys under `prefix` in sorted order.
    ///
    /// A missing root is treated as an empty store.
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            if !root.exists() {
                return Ok(Vec::new());
            }

            let mut keys = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.ends_with(TEMP_SUFFIX) || !key.starts_with(&prefix) {
                    continue;
                }
                keys.push(key);
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .context("blob listing task failed")?
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key)?;
        fs::read(&full_path)
            .await
            .with_context(|| format!("Failed to read blob {}", full_path.display()))
    }
}
