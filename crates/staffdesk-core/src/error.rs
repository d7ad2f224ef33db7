//! Error types module
//!
//! This module provides the core error types used throughout Staffdesk.
//! All errors are unified under the `AppError` enum which can represent validation,
//! upload state, integrity, storage and tenancy failures.

use serde_json::json;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like state conflicts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPLOAD_INCOMPLETE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tenant could not be identified: {0}")]
    TenantNotIdentified(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Upload incomplete: {received}/{total} chunks received, missing {missing_indices:?}")]
    IncompleteUpload {
        missing_indices: Vec<u32>,
        received: usize,
        total: u32,
    },

    #[error("Integrity check failed: expected {expected} bytes, assembled {actual} bytes")]
    IntegrityMismatch { expected: u64, actual: u64 },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Initialize a new upload session"),
            false,
            LogLevel::Debug,
        ),
        AppError::TenantNotIdentified(_) => (
            404,
            "TENANT_NOT_IDENTIFIED",
            false,
            Some("Check the request domain"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidState(_) => (
            400,
            "INVALID_STATE",
            false,
            Some("Check the upload status before retrying"),
            false,
            LogLevel::Warn,
        ),
        AppError::IncompleteUpload { .. } => (
            400,
            "UPLOAD_INCOMPLETE",
            true,
            Some("Upload the missing chunks and assemble again"),
            false,
            LogLevel::Debug,
        ),
        AppError::IntegrityMismatch { .. } => (
            400,
            "INTEGRITY_ERROR",
            false,
            Some("Restart the upload"),
            false,
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Split the file into smaller chunks"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "ValidationError",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFoundError",
            AppError::TenantNotIdentified(_) => "TenantNotIdentified",
            AppError::InvalidState(_) => "InvalidStateError",
            AppError::IncompleteUpload { .. } => "IncompleteUploadError",
            AppError::IntegrityMismatch { .. } => "IntegrityError",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Storage(_) => "StorageError",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Structured, non-sensitive fields a client needs to decide how to recover.
    pub fn context_fields(&self) -> Option<serde_json::Value> {
        match self {
            AppError::IncompleteUpload {
                missing_indices,
                received,
                total,
            } => Some(json!({
                "missing_indices": missing_indices,
                "received_count": received,
                "total_chunks": total,
            })),
            AppError::IntegrityMismatch { expected, actual } => Some(json!({
                "expected_size": expected,
                "actual_size": actual,
            })),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::TenantNotIdentified(ref domain) => {
                format!("Tenant could not be identified on domain {}", domain)
            }
            AppError::InvalidState(ref msg) => msg.clone(),
            AppError::IncompleteUpload {
                missing_indices,
                received,
                total,
            } => format!(
                "Upload incomplete: {}/{} chunks received, {} missing",
                received,
                total,
                missing_indices.len()
            ),
            AppError::IntegrityMismatch { expected, actual } => format!(
                "Assembled size {} bytes does not match declared size {} bytes",
                actual, expected
            ),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Upload session not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Upload session not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_storage_is_sensitive() {
        let err = AppError::Storage("disk full at /var/lib".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_incomplete_upload_carries_missing_indices() {
        let err = AppError::IncompleteUpload {
            missing_indices: vec![2, 4],
            received: 3,
            total: 5,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "UPLOAD_INCOMPLETE");
        let fields = err.context_fields().expect("context fields");
        assert_eq!(fields["missing_indices"], json!([2, 4]));
        assert_eq!(fields["total_chunks"], json!(5));
        assert!(err.client_message().contains("3/5"));
    }

    #[test]
    fn test_integrity_mismatch_fields() {
        let err = AppError::IntegrityMismatch {
            expected: 10,
            actual: 9,
        };
        assert_eq!(err.error_type(), "IntegrityError");
        let fields = err.context_fields().expect("context fields");
        assert_eq!(fields["expected_size"], json!(10));
        assert_eq!(fields["actual_size"], json!(9));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error"));
        assert!(details.contains("Caused by"));
    }

    #[test]
    fn test_tenant_not_identified_is_404() {
        let err = AppError::TenantNotIdentified("unknown.example.com".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert!(err.client_message().contains("unknown.example.com"));
        assert!(err.context_fields().is_none());
    }
}
