//! Staffdesk Storage Library
//!
//! This crate provides the two persistence seams the upload pipeline relies on:
//!
//! - [`Storage`]: byte storage for scratch chunks and assembled artifacts
//!   (implemented by [`LocalStorage`]).
//! - [`CacheStore`]: a TTL-capable key-value store for session metadata
//!   (implemented by [`MemoryCacheStore`] and [`FileCacheStore`]).
//!
//! # Key layout
//!
//! Keys are namespace-scoped. The namespace segment is derived from the active cache
//! prefix, so tenants never share scratch or artifact directories:
//!
//! - Scratch chunks: `scratch/{namespace}/{upload_id}/{index}.part`
//! - Artifacts: `files/{namespace}/{relative_path}`
//! - Session metadata: `{prefix}upload_session:{upload_id}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! [`keys`] module.

pub mod cache;
pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use cache::{CacheStore, FileCacheStore, MemoryCacheStore};
pub use factory::{create_cache_store, create_storage};
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
