//! TTL-capable key-value stores for session metadata.
//!
//! Stores know nothing about tenants: isolation comes from the prefix the caller puts
//! on every key. That keeps the scheme uniform across backends that have no native
//! namespace or tagging support.

mod file;
mod memory;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent or expired. Expired entries are left in
    /// place for `evict_expired`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> StorageResult<()>;

    /// Remove `key`. Returns whether a live entry was removed.
    async fn forget(&self, key: &str) -> StorageResult<bool>;

    /// Remove every expired entry and return the `(key, value)` pairs that were evicted.
    async fn evict_expired(&self) -> StorageResult<Vec<(String, String)>>;

    /// Driver name for logs.
    fn driver_name(&self) -> &'static str;
}

/// Read and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e)))?;
    store.put(key, raw, ttl).await
}
