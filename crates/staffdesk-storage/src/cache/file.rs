use super::CacheStore;
use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: String,
    expires_at: DateTime<Utc>,
}

/// Cache store keeping one JSON file per key under a directory.
#[derive(Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub async fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(key)))
    }

    async fn read_entry(path: &Path) -> StorageResult<Option<FileEntry>> {
        match fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    async fn remove(path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete cache entry {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.entry_path(key);
        Ok(Self::read_entry(&path)
            .await?
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> StorageResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::BackendError(format!("Invalid TTL: {}", e)))?;
        let entry = FileEntry {
            key: key.to_string(),
            value,
            expires_at: Utc::now() + ttl,
        };
        let raw = serde_json::to_vec(&entry)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e)))?;

        let path = self.entry_path(key);
        let temp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&temp, raw).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::IoError(e));
        }
        Ok(())
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        let path = self.entry_path(key);
        let live = matches!(
            Self::read_entry(&path).await?,
            Some(entry) if entry.expires_at > Utc::now()
        );
        Self::remove(&path).await?;
        Ok(live)
    }

    async fn evict_expired(&self) -> StorageResult<Vec<(String, String)>> {
        let now = Utc::now();
        let mut evicted = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let entry = match Self::read_entry(&path).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Skipping unreadable cache entry");
                    continue;
                }
            };
            if entry.expires_at <= now {
                Self::remove(&path).await?;
                evicted.push((entry.key, entry.value));
            }
        }

        Ok(evicted)
    }

    fn driver_name(&self) -> &'static str {
        "file"
    }
}
