//! Staffdesk Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every Staffdesk component: tenancy primitives, upload session state and the
//! unified `AppError`.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{CacheDriver, Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{NamespaceContext, TenantIdentity, UploadSession, UploadStatus};
