use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a chunked upload.
///
/// `initialized -> in_progress -> assembling -> completed`; `cancelled` and `expired`
/// are reachable from `initialized` or `in_progress`. `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Initialized,
    InProgress,
    Assembling,
    Completed,
    Cancelled,
    Expired,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Cancelled)
    }

    pub fn accepts_chunks(self) -> bool {
        matches!(self, UploadStatus::Initialized | UploadStatus::InProgress)
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            UploadStatus::Initialized => "initialized",
            UploadStatus::InProgress => "in_progress",
            UploadStatus::Assembling => "assembling",
            UploadStatus::Completed => "completed",
            UploadStatus::Cancelled => "cancelled",
            UploadStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// One in-progress upload, persisted in the metadata store under the request namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: Uuid,
    pub filename: String,
    pub total_size: u64,
    pub total_chunks: u32,
    pub mime_type: Option<String>,
    pub folder: Option<String>,
    pub owner_id: Option<String>,
    /// Received chunk index -> byte length of the stored chunk.
    pub received_chunks: BTreeMap<u32, u64>,
    pub status: UploadStatus,
    /// Cache prefix the session was created under.
    pub namespace: String,
    /// Storage path of the assembled artifact once completed.
    pub assembled_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn received_count(&self) -> usize {
        self.received_chunks.len()
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_chunks.values().sum()
    }

    /// Indices in `[0, total_chunks)` that have not been received, ascending.
    pub fn missing_indices(&self) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|i| !self.received_chunks.contains_key(i))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.received_chunks.len() == self.total_chunks as usize
            && self.received_chunks.keys().all(|i| *i < self.total_chunks)
    }

    /// Lowest index still missing, if any.
    pub fn next_expected_index(&self) -> Option<u32> {
        (0..self.total_chunks).find(|i| !self.received_chunks.contains_key(i))
    }

    /// Record a stored chunk. Re-recording an index replaces its size and is not double-counted.
    pub fn record_chunk(&mut self, index: u32, size: u64, now: DateTime<Utc>) {
        self.received_chunks.insert(index, size);
        if self.status == UploadStatus::Initialized {
            self.status = UploadStatus::InProgress;
        }
        self.updated_at = now;
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        let pct = (self.received_bytes() as f64 / self.total_size as f64) * 100.0;
        pct.min(100.0)
    }

    /// Suggested chunk size so that `total_chunks` chunks cover `total_size`.
    pub fn chunk_size_hint(total_size: u64, total_chunks: u32) -> u64 {
        if total_chunks == 0 {
            return total_size;
        }
        total_size.div_ceil(u64::from(total_chunks))
    }
}
