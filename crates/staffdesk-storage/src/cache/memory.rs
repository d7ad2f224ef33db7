use super::CacheStore;
use crate::traits::StorageResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache store. Expired entries read as absent but stay put until `evict_expired`
/// hands them back.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self.inner.lock().await;
        let now = Instant::now();
        Ok(guard
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> StorageResult<()> {
        let mut guard = self.inner.lock().await;
        guard.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        Ok(guard
            .remove(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false))
    }

    async fn evict_expired(&self) -> StorageResult<Vec<(String, String)>> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        Ok(expired
            .into_iter()
            .filter_map(|key| guard.remove(&key).map(|entry| (key, entry.value)))
            .collect())
    }

    fn driver_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_forget() {
        let store = MemoryCacheStore::new();
        store
            .put("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.forget("k").await.unwrap());
        assert!(!store.forget("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_lazily() {
        let store = MemoryCacheStore::new();
        store
            .put("k", "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.len().await, 1);

        let evicted = store.evict_expired().await.unwrap();
        assert_eq!(evicted, vec![("k".to_string(), "v".to_string())]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_evict_expired_returns_evicted_pairs() {
        let store = MemoryCacheStore::new();
        store
            .put("old", "1".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .put("new", "2".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let evicted = store.evict_expired().await.unwrap();
        assert_eq!(evicted, vec![("old".to_string(), "1".to_string())]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_prefixes_isolate_keys() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.put("p_tenant_a_k", "a".to_string(), ttl).await.unwrap();
        store.put("p_tenant_b_k", "b".to_string(), ttl).await.unwrap();
        assert_eq!(store.get("p_tenant_a_k").await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.get("p_tenant_b_k").await.unwrap().as_deref(), Some("b"));
    }
}
