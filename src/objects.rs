use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::UploadConfig;

const MAX_EXTENSION_LEN: usize = 8;

/// Destination for uploaded files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return its public location.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;
}

/// Object store writing into a local directory that is served under `public_base_url`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create upload directory {}", self.root.display()))?;

        let path = self.root.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload {}", path.display()))?;

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// `<unix millis>-<random>[.<ext>]`
///
/// The extension comes from `filename` and is kept only if it is short ASCII
/// alphanumeric, so keys are always safe as a single path segment. Uniqueness
/// relies on the random suffix; nothing checks for an existing object.
pub fn generate_object_key(filename: Option<&str>) -> String {
    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });

    let stem = format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple());
    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}
