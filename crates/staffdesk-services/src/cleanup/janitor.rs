use crate::upload::ChunkedUploadService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Periodically purges expired upload sessions and their scratch chunks.
///
/// Expiry is already enforced lazily on every read; the janitor only reclaims the storage
/// abandoned sessions leave behind.
#[derive(Clone)]
pub struct UploadJanitor {
    uploads: Arc<ChunkedUploadService>,
    period: Duration,
}

impl UploadJanitor {
    pub fn new(uploads: Arc<ChunkedUploadService>, period: Duration) -> Self {
        Self { uploads, period }
    }

    /// Start the background sweep loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.period);
            // The first tick completes immediately.
            sweep_interval.tick().await;

            loop {
                sweep_interval.tick().await;
                self.sweep().await;
            }
        })
    }

    /// Run one sweep. Returns the number of sessions purged.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expired_uploads"))]
    pub async fn sweep(&self) -> usize {
        match self.uploads.purge_expired().await {
            Ok(0) => 0,
            Ok(count) => {
                tracing::info!(count, "Purged expired upload sessions");
                count
            }
            Err(e) => {
                tracing::error!(error = %e, "Upload janitor sweep failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{UploadConfig, UploadMetadata};
    use bytes::Bytes;
    use staffdesk_core::NamespaceContext;
    use staffdesk_storage::keys::chunk_key;
    use staffdesk_storage::{LocalStorage, MemoryCacheStore, Storage};

    #[tokio::test]
    async fn test_background_sweep_reclaims_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/files".to_string())
                .await
                .unwrap(),
        );
        let uploads = Arc::new(ChunkedUploadService::new(
            Arc::new(MemoryCacheStore::new()),
            storage.clone(),
            UploadConfig {
                session_ttl: Duration::from_millis(100),
                ..Default::default()
            },
        ));
        let ns = NamespaceContext::central("app_");
        let id = uploads
            .initialize_upload(&ns, "a.bin", 4, 2, UploadMetadata::default())
            .await
            .unwrap()
            .upload_id;
        uploads
            .upload_chunk(&ns, id, 0, Bytes::from_static(b"ab"))
            .await
            .unwrap();

        let janitor = Arc::new(UploadJanitor::new(uploads, Duration::from_millis(50)));
        let handle = janitor.clone().start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.abort();

        assert!(!storage.exists(&chunk_key("app_", id, 0)).await.unwrap());
        assert_eq!(janitor.sweep().await, 0);
    }
}
