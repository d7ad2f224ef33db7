use crate::{CacheStore, FileCacheStore, LocalStorage, MemoryCacheStore, Storage, StorageResult};
use staffdesk_core::{CacheDriver, Config};
use std::sync::Arc;

/// Create the byte storage backend from configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(
        config.storage_path().clone(),
        config.storage_base_url().to_string(),
    )
    .await?;

    tracing::info!(
        path = %config.storage_path().display(),
        "Local storage initialized"
    );

    Ok(Arc::new(storage))
}

/// Create the session metadata store from configuration
pub async fn create_cache_store(config: &Config) -> StorageResult<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.cache_driver() {
        CacheDriver::Memory => Arc::new(MemoryCacheStore::new()),
        CacheDriver::File => Arc::new(FileCacheStore::new(config.cache_path().clone()).await?),
    };

    tracing::info!(
        driver = store.driver_name(),
        prefix = %config.cache_prefix(),
        "Cache store initialized"
    );

    Ok(store)
}
