//! Filesystem store for uploaded ticket photos.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat directory of uploads, one file per ticket. Filenames are prefixed
/// with the upload time so listings sort chronologically.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn init(&self) -> Result<(), ImageStoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Write `bytes` under a timestamped, sanitized name and return the
    /// stored path.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf, ImageStoreError> {
        let filename = format!(
            "{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            sanitize(original_name)
        );
        let path = self.root.join(filename);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub async fn remove(&self, path: &Path) -> Result<(), ImageStoreError> {
        fs::remove_file(path).await?;
        Ok(())
    }
}

/// Keep only the final path component and replace anything outside a safe
/// character set, so a client-supplied name can never escape the store.
fn sanitize(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
