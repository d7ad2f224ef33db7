use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffdesk_core::constants::{DEFAULT_UPLOAD_SESSION_TTL_SECS, MAX_TOTAL_CHUNKS};
use staffdesk_core::{AppError, Config, UploadStatus};
use staffdesk_storage::StorageError;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// Pipeline failures. Every variant carries what a client needs to decide between
/// retrying, resending chunks or starting over.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("Upload session {0} not found or expired")]
    NotFound(Uuid),

    #[error("Upload {upload_id} is {status}: {message}")]
    InvalidState {
        upload_id: Uuid,
        status: UploadStatus,
        message: String,
    },

    #[error("Upload incomplete: {received}/{total} chunks received")]
    IncompleteUpload {
        missing_indices: Vec<u32>,
        received: usize,
        total: u32,
    },

    #[error("Assembled size {actual} does not match declared size {expected}")]
    Integrity { expected: u64, actual: u64 },

    #[error("Chunk of {size} bytes exceeds the {limit} byte limit")]
    ChunkTooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    pub(crate) fn invalid_state(
        upload_id: Uuid,
        status: UploadStatus,
        message: impl Into<String>,
    ) -> Self {
        UploadError::InvalidState {
            upload_id,
            status,
            message: message.into(),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(msg) => AppError::InvalidInput(msg),
            UploadError::NotFound(_) => AppError::NotFound(err.to_string()),
            UploadError::InvalidState { .. } => AppError::InvalidState(err.to_string()),
            UploadError::IncompleteUpload {
                missing_indices,
                received,
                total,
            } => AppError::IncompleteUpload {
                missing_indices,
                received,
                total,
            },
            UploadError::Integrity { expected, actual } => {
                AppError::IntegrityMismatch { expected, actual }
            }
            UploadError::ChunkTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            UploadError::Storage(StorageError::InvalidKey(msg)) => AppError::InvalidInput(msg),
            UploadError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// Limits applied by the pipeline.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub session_ttl: Duration,
    pub max_chunks: u32,
    pub max_file_size: u64,
    pub max_chunk_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_UPLOAD_SESSION_TTL_SECS),
            max_chunks: MAX_TOTAL_CHUNKS,
            max_file_size: 5 * 1024 * 1024 * 1024,
            max_chunk_size: 50 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_ttl: Duration::from_secs(config.upload_session_ttl_secs()),
            max_chunks: config.upload_max_chunks().min(MAX_TOTAL_CHUNKS),
            max_file_size: config.upload_max_file_size_bytes(),
            max_chunk_size: config.upload_max_chunk_size_bytes(),
        }
    }
}

/// Optional descriptive fields supplied at initialization.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub mime_type: Option<String>,
    pub folder: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializedUpload {
    pub upload_id: Uuid,
    /// Suggested size of every chunk but the last.
    pub chunk_size: u64,
    pub total_chunks: u32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReceipt {
    pub upload_id: Uuid,
    pub chunk_index: u32,
    pub received_count: usize,
    pub total_chunks: u32,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssembledUpload {
    pub upload_id: Uuid,
    /// Storage key of the artifact.
    pub path: String,
    pub url: String,
    pub size: u64,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusReport {
    pub upload_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
    pub received_count: usize,
    pub total_chunks: u32,
    pub missing_indices: Vec<u32>,
    pub received_bytes: u64,
    pub total_size: u64,
    pub progress_percent: f64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInfo {
    pub upload_id: Uuid,
    pub received_chunks: Vec<u32>,
    pub total_chunks: u32,
    /// Lowest missing index; `None` once every chunk is stored.
    pub next_expected_index: Option<u32>,
    pub chunk_size: u64,
    pub status: UploadStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffdesk_core::ErrorMetadata;

    #[test]
    fn test_incomplete_upload_maps_with_indices() {
        let err: AppError = UploadError::IncompleteUpload {
            missing_indices: vec![2, 4],
            received: 3,
            total: 5,
        }
        .into();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "UPLOAD_INCOMPLETE");
        let fields = err.context_fields().unwrap();
        assert_eq!(fields["missing_indices"], serde_json::json!([2, 4]));
    }

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        let not_found: AppError = UploadError::NotFound(id).into();
        assert_eq!(not_found.http_status_code(), 404);

        let state: AppError =
            UploadError::invalid_state(id, UploadStatus::Completed, "already assembled").into();
        assert_eq!(state.error_code(), "INVALID_STATE");

        let too_large: AppError = UploadError::ChunkTooLarge { size: 10, limit: 5 }.into();
        assert_eq!(too_large.http_status_code(), 413);

        let storage: AppError =
            UploadError::Storage(StorageError::UploadFailed("disk full".into())).into();
        assert_eq!(storage.http_status_code(), 500);
    }
}
