use staffdesk_storage::{CacheStore, StorageResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Cache handle bound to the prefix that was current when it was opened.
pub struct CacheConnection {
    store: Arc<dyn CacheStore>,
    prefix: String,
    generation: u64,
}

impl CacheConnection {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Monotonic id; a new value means the previous connection was dropped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.store.get(&self.key(key)).await
    }

    pub async fn put(&self, key: &str, value: String, ttl: Duration) -> StorageResult<()> {
        self.store.put(&self.key(key), value, ttl).await
    }

    pub async fn forget(&self, key: &str) -> StorageResult<bool> {
        self.store.forget(&self.key(key)).await
    }
}

/// Mutable cache configuration for one request: the current key prefix plus a lazily
/// opened connection using it.
///
/// Changing the prefix does not touch an open connection; callers must
/// [`forget_connection`](Self::forget_connection) so the next access reopens with the new
/// prefix.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    prefix: RwLock<String>,
    connection: RwLock<Option<Arc<CacheConnection>>>,
    generations: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: RwLock::new(prefix.into()),
            connection: RwLock::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> String {
        read(&self.prefix).clone()
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        *write(&self.prefix) = prefix.into();
    }

    /// Current connection, opening one with the current prefix if none is open.
    pub fn connection(&self) -> Arc<CacheConnection> {
        if let Some(conn) = read(&self.connection).as_ref() {
            return conn.clone();
        }

        let mut slot = write(&self.connection);
        if let Some(conn) = slot.as_ref() {
            return conn.clone();
        }
        let conn = Arc::new(CacheConnection {
            store: self.store.clone(),
            prefix: self.prefix(),
            generation: self.generations.fetch_add(1, Ordering::Relaxed) + 1,
        });
        *slot = Some(conn.clone());
        conn
    }

    /// Drop the open connection, if any.
    pub fn forget_connection(&self) {
        write(&self.connection).take();
    }

    pub fn has_connection(&self) -> bool {
        read(&self.connection).is_some()
    }
}
