use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/staffdesk/app")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Only plain relative components are accepted, so a key can never escape the
    /// base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                storage_key
            )));
        }

        let relative = Path::new(storage_key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key resolves outside storage directory: {}",
                storage_key
            )));
        }

        Ok(self.base_path.join(relative))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Sibling temp path; renamed over the target once fully written.
    fn temp_path_for(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }

    async fn commit_temp(temp: &Path, path: &Path) -> StorageResult<()> {
        if let Err(e) = fs::rename(temp, path).await {
            let _ = fs::remove_file(temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Bytes) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len() as u64;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let temp = Self::temp_path_for(&path);

        let mut file = fs::File::create(&temp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", temp.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", temp.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", temp.display(), e))
        })?;
        drop(file);

        Self::commit_temp(&temp, &path).await?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(size)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Ok(Bytes::from(data))
    }

    async fn put_stream(
        &self,
        storage_key: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;
        let temp = Self::temp_path_for(&path);

        let mut file = fs::File::create(&temp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", temp.display(), e))
        })?;

        let bytes_copied = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", temp.display(), e))
        })?;
        drop(file);

        Self::commit_temp(&temp, &path).await?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let stream = tokio_util::io::ReaderStream::new(file).map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %storage_key, "Local storage delete successful");

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_to_path(prefix.trim_end_matches('/'))?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        let result = if fs::metadata(&path).await?.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };

        result.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete {}: {}", path.display(), e))
        })?;

        tracing::debug!(prefix = %prefix, "Local storage prefix delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn url_for(&self, storage_key: &str) -> String {
        let path = storage_key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .expect("storage");
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let (_dir, storage) = storage().await;
        storage.put("a/b.part", Bytes::from_static(b"first")).await.unwrap();
        storage.put("a/b.part", Bytes::from_static(b"second!")).await.unwrap();

        assert_eq!(storage.get("a/b.part").await.unwrap(), Bytes::from_static(b"second!"));
        assert_eq!(storage.content_length("a/b.part").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let (_dir, storage) = storage().await;
        for key in ["../escape", "/abs", "a/../../b", "", "a\\b"] {
            let err = storage.put(key, Bytes::from_static(b"x")).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.get("nope").await.unwrap_err(),
            StorageError::NotFound(_)
        ));
        assert!(matches!(
            storage.content_length("nope").await.unwrap_err(),
            StorageError::NotFound(_)
        ));
        assert!(!storage.exists("nope").await.unwrap());
        storage.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_directory() {
        let (_dir, storage) = storage().await;
        storage.put("scratch/ns/1/0.part", Bytes::from_static(b"x")).await.unwrap();
        storage.put("scratch/ns/1/1.part", Bytes::from_static(b"y")).await.unwrap();
        storage.put("scratch/ns/2/0.part", Bytes::from_static(b"z")).await.unwrap();

        storage.delete_prefix("scratch/ns/1").await.unwrap();

        assert!(!storage.exists("scratch/ns/1/0.part").await.unwrap());
        assert!(storage.exists("scratch/ns/2/0.part").await.unwrap());
        storage.delete_prefix("scratch/ns/1").await.unwrap();
    }

    #[tokio::test]
    async fn test_stream_round_trip() {
        let (_dir, storage) = storage().await;
        let reader: Pin<Box<dyn AsyncRead + Send + Unpin>> =
            Box::pin(std::io::Cursor::new(vec![7u8; 100_000]));
        let written = storage.put_stream("files/big.bin", reader).await.unwrap();
        assert_eq!(written, 100_000);

        let chunks: Vec<Bytes> = storage
            .get_stream("files/big.bin")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 100_000);
    }

    #[tokio::test]
    async fn test_url_for() {
        let (_dir, storage) = storage().await;
        assert_eq!(
            storage.url_for("files/acme/report.pdf"),
            "http://localhost/files/files/acme/report.pdf"
        );
        assert_eq!(
            storage.url_for("files/app_tenant_acme%2Ehr_/pay slip.pdf"),
            "http://localhost/files/files/app_tenant_acme%252Ehr_/pay%20slip.pdf"
        );
    }
}
