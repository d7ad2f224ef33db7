//! Storage abstraction trait
//!
//! This module defines the Storage trait that byte-storage backends implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Stream of byte chunks read from storage.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Writes to a single key are atomic: a reader observes either the previous or the new
/// content, never an interleaving, and the last completed write wins.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` to `storage_key`, replacing any existing content. Returns bytes written.
    async fn put(&self, storage_key: &str, data: Bytes) -> StorageResult<u64>;

    /// Read the whole object at `storage_key`.
    async fn get(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Write everything `reader` yields to `storage_key`. Returns bytes written.
    ///
    /// The reader is consumed until EOF; the object only becomes visible once complete.
    async fn put_stream(
        &self,
        storage_key: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Read the object at `storage_key` as a stream.
    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Delete a single object. Deleting a missing object is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Delete every object under `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of an object.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Public URL for an object.
    fn url_for(&self, storage_key: &str) -> String;
}
