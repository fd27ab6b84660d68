//! Client-local durable cache: one JSON blob under a fixed key.

use super::error::{ClientError, Result};
use crate::models::TableSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;

pub const CACHE_KEY: &str = "habit_tracker_snapshot";

/// Key/value store holding the last merged snapshot.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn read_blob(&self, key: &str) -> Option<String>;
    async fn write_blob(&mut self, key: &str, blob: String) -> Result<()>;

    /// Unreadable or unparsable blobs count as absent.
    async fn load(&self) -> Option<TableSnapshot> {
        let blob = self.read_blob(CACHE_KEY).await?;
        match serde_json::from_str(&blob) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!("discarding unreadable cached snapshot: {err}");
                None
            }
        }
    }

    async fn store(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        let blob =
            serde_json::to_string(snapshot).map_err(|err| ClientError::Cache(err.to_string()))?;
        self.write_blob(CACHE_KEY, blob).await
    }
}

/// One file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn read_blob(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)).await {
            Ok(blob) => Some(blob),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!("failed to read cache {key}: {err}");
                None
            }
        }
    }

    async fn write_blob(&mut self, key: &str, blob: String) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| ClientError::Cache(err.to_string()))?;
        fs::write(self.path(key), blob)
            .await
            .map_err(|err| ClientError::Cache(err.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn read_blob(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    async fn write_blob(&mut self, key: &str, blob: String) -> Result<()> {
        self.entries.insert(key.to_string(), blob);
        Ok(())
    }
}
