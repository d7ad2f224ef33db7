use super::locks::SessionLocks;
use super::types::{
    AssembledUpload, ChunkReceipt, InitializedUpload, ResumeInfo, UploadConfig, UploadError,
    UploadMetadata, UploadStatusReport,
};
use super::validation::{validate_filename, validate_relative_path};
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use staffdesk_core::{NamespaceContext, UploadSession, UploadStatus};
use staffdesk_storage::cache::{get_json, put_json};
use staffdesk_storage::keys::{artifact_key, chunk_key, scratch_prefix, session_cache_key};
use staffdesk_storage::{CacheStore, Storage};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Chunked upload state machine.
///
/// Session records live in the cache store under the caller's namespace; chunk bytes and
/// artifacts live in byte storage under a segment derived from the same namespace. Every
/// operation takes the [`NamespaceContext`] explicitly, so the service holds no tenant state.
pub struct ChunkedUploadService {
    sessions: Arc<dyn CacheStore>,
    storage: Arc<dyn Storage>,
    config: UploadConfig,
    locks: SessionLocks,
}

impl ChunkedUploadService {
    pub fn new(
        sessions: Arc<dyn CacheStore>,
        storage: Arc<dyn Storage>,
        config: UploadConfig,
    ) -> Self {
        Self {
            sessions,
            storage,
            config,
            locks: SessionLocks::default(),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Create a session in `initialized` state.
    #[tracing::instrument(skip(self, ns, metadata), fields(namespace = %ns.prefix()))]
    pub async fn initialize_upload(
        &self,
        ns: &NamespaceContext,
        filename: &str,
        total_size: u64,
        total_chunks: u32,
        metadata: UploadMetadata,
    ) -> Result<InitializedUpload, UploadError> {
        validate_filename(filename)?;
        if total_size == 0 {
            return Err(UploadError::Validation(
                "total_size must be at least 1 byte".to_string(),
            ));
        }
        if total_size > self.config.max_file_size {
            return Err(UploadError::Validation(format!(
                "total_size exceeds the maximum of {} bytes",
                self.config.max_file_size
            )));
        }
        if total_chunks == 0 || total_chunks > self.config.max_chunks {
            return Err(UploadError::Validation(format!(
                "total_chunks must be between 1 and {}",
                self.config.max_chunks
            )));
        }
        if u64::from(total_chunks) > total_size {
            return Err(UploadError::Validation(
                "total_chunks cannot exceed total_size: each chunk must carry at least one byte"
                    .to_string(),
            ));
        }
        if let Some(folder) = metadata.folder.as_deref() {
            validate_relative_path(folder, "folder")?;
        }

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.session_ttl)
            .map_err(|e| UploadError::Validation(format!("Invalid session TTL: {}", e)))?;
        let session = UploadSession {
            upload_id: Uuid::new_v4(),
            filename: filename.trim().to_string(),
            total_size,
            total_chunks,
            mime_type: metadata.mime_type,
            folder: metadata.folder.map(|f| f.trim().trim_end_matches('/').to_string()),
            owner_id: metadata.owner_id,
            received_chunks: BTreeMap::new(),
            status: UploadStatus::Initialized,
            namespace: ns.prefix().to_string(),
            assembled_path: None,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        };

        let key = session_cache_key(ns, session.upload_id);
        put_json(self.sessions.as_ref(), &key, &session, self.config.session_ttl).await?;

        tracing::info!(
            upload_id = %session.upload_id,
            filename = %session.filename,
            total_size,
            total_chunks,
            scratch = %scratch_prefix(&session.namespace, session.upload_id),
            "Chunked upload session initialized"
        );

        Ok(InitializedUpload {
            upload_id: session.upload_id,
            chunk_size: UploadSession::chunk_size_hint(total_size, total_chunks),
            total_chunks,
            expires_at: session.expires_at,
        })
    }

    /// Store one chunk, replacing any earlier bytes for the same index.
    ///
    /// Chunk bytes for different indices are written in parallel; only the session update
    /// is serialised per upload.
    #[tracing::instrument(skip(self, ns, data), fields(namespace = %ns.prefix(), size = data.len()))]
    pub async fn upload_chunk(
        &self,
        ns: &NamespaceContext,
        upload_id: Uuid,
        chunk_index: u32,
        data: Bytes,
    ) -> Result<ChunkReceipt, UploadError> {
        let key = session_cache_key(ns, upload_id);
        let session = self.load_session(&key, upload_id).await?;
        Self::ensure_accepts_chunks(&session)?;

        if chunk_index >= session.total_chunks {
            return Err(UploadError::Validation(format!(
                "chunk_index {} is out of range (0..{})",
                chunk_index, session.total_chunks
            )));
        }
        let size = data.len() as u64;
        if size == 0 {
            return Err(UploadError::Validation("Chunk is empty".to_string()));
        }
        if size > self.config.max_chunk_size {
            return Err(UploadError::ChunkTooLarge {
                size,
                limit: self.config.max_chunk_size,
            });
        }

        let stored = chunk_key(&session.namespace, upload_id, chunk_index);
        self.storage.put(&stored, data).await?;

        let _guard = self.locks.acquire(&key).await;
        // Re-read under the lock: other chunks, an assembly or a cancel may have landed meanwhile.
        let reread = self
            .load_session(&key, upload_id)
            .await
            .and_then(|session| Self::ensure_accepts_chunks(&session).map(|()| session));
        let mut session = match reread {
            Ok(session) => session,
            Err(e) => {
                if Self::orphans_chunk(&e) {
                    if let Err(delete_err) = self.storage.delete(&stored).await {
                        tracing::warn!(error = %delete_err, chunk = %stored, "Failed to delete orphaned chunk");
                    }
                }
                return Err(e);
            }
        };

        session.record_chunk(chunk_index, size, Utc::now());
        self.save_session(&key, &session).await?;

        tracing::debug!(
            upload_id = %upload_id,
            chunk_index,
            received = session.received_count(),
            total = session.total_chunks,
            "Chunk stored"
        );

        Ok(ChunkReceipt {
            upload_id,
            chunk_index,
            received_count: session.received_count(),
            total_chunks: session.total_chunks,
            is_complete: session.is_complete(),
        })
    }

    /// Concatenate every chunk in index order into the final artifact.
    ///
    /// The session is moved to `assembling` first so late chunks are rejected. On any
    /// failure it returns to `in_progress` and its chunks are kept for a retry.
    #[tracing::instrument(skip(self, ns), fields(namespace = %ns.prefix()))]
    pub async fn assemble_chunks(
        &self,
        ns: &NamespaceContext,
        upload_id: Uuid,
        destination_path: Option<&str>,
    ) -> Result<AssembledUpload, UploadError> {
        let key = session_cache_key(ns, upload_id);

        let session = {
            let _guard = self.locks.acquire(&key).await;
            let mut session = self.load_session(&key, upload_id).await?;

            match session.status {
                UploadStatus::Initialized | UploadStatus::InProgress => {}
                UploadStatus::Assembling => {
                    return Err(UploadError::invalid_state(
                        upload_id,
                        session.status,
                        "assembly is already running",
                    ))
                }
                status => {
                    return Err(UploadError::invalid_state(
                        upload_id,
                        status,
                        "upload can no longer be assembled",
                    ))
                }
            }

            if !session.is_complete() {
                return Err(UploadError::IncompleteUpload {
                    missing_indices: session.missing_indices(),
                    received: session.received_count(),
                    total: session.total_chunks,
                });
            }

            let relative = self.destination_for(&session, destination_path)?;
            session.assembled_path = Some(artifact_key(&session.namespace, &relative));
            session.status = UploadStatus::Assembling;
            session.updated_at = Utc::now();
            self.save_session(&key, &session).await?;
            session
        };

        match self.write_artifact(&session).await {
            Ok(assembled) => self.finish_assembly(&key, session, assembled).await,
            Err(e) => {
                self.restore_in_progress(&key, upload_id).await;
                Err(e)
            }
        }
    }

    async fn write_artifact(&self, session: &UploadSession) -> Result<AssembledUpload, UploadError> {
        let start = Instant::now();
        let upload_id = session.upload_id;
        let declared = session.received_bytes();
        if declared != session.total_size {
            return Err(UploadError::Integrity {
                expected: session.total_size,
                actual: declared,
            });
        }

        let destination = session.assembled_path.clone().ok_or_else(|| {
            UploadError::invalid_state(upload_id, session.status, "no destination recorded")
        })?;

        let chunk_keys: Vec<String> = (0..session.total_chunks)
            .map(|index| chunk_key(&session.namespace, upload_id, index))
            .collect();
        let storage = self.storage.clone();
        let stream = futures::stream::iter(chunk_keys)
            .then(move |key| {
                let storage = storage.clone();
                async move { storage.get_stream(&key).await }
            })
            .try_flatten()
            .map_err(std::io::Error::other);
        let reader = StreamReader::new(Box::pin(stream));

        let written = self
            .storage
            .put_stream(&destination, Box::pin(reader))
            .await?;

        if written != session.total_size {
            if let Err(e) = self.storage.delete(&destination).await {
                tracing::warn!(error = %e, path = %destination, "Failed to remove mismatched artifact");
            }
            return Err(UploadError::Integrity {
                expected: session.total_size,
                actual: written,
            });
        }

        tracing::info!(
            upload_id = %upload_id,
            path = %destination,
            size_bytes = written,
            chunks = session.total_chunks,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunked upload assembled"
        );

        Ok(AssembledUpload {
            upload_id,
            url: self.storage.url_for(&destination),
            path: destination,
            size: written,
            status: UploadStatus::Completed,
        })
    }

    async fn finish_assembly(
        &self,
        key: &str,
        mut session: UploadSession,
        assembled: AssembledUpload,
    ) -> Result<AssembledUpload, UploadError> {
        session.status = UploadStatus::Completed;
        session.updated_at = Utc::now();
        let saved = {
            let _guard = self.locks.acquire(key).await;
            self.save_session(key, &session).await
        };

        // Scratch is released only after the completed record is stored.
        if let Err(e) = saved {
            if let Err(delete_err) = self.storage.delete(&assembled.path).await {
                tracing::warn!(error = %delete_err, path = %assembled.path, "Failed to remove unrecorded artifact");
            }
            self.restore_in_progress(key, session.upload_id).await;
            return Err(e);
        }

        let scratch = scratch_prefix(&session.namespace, session.upload_id);
        if let Err(e) = self.storage.delete_prefix(&scratch).await {
            tracing::warn!(error = %e, scratch = %scratch, "Failed to delete scratch chunks");
        }
        Ok(assembled)
    }

    async fn restore_in_progress(&self, key: &str, upload_id: Uuid) {
        let _guard = self.locks.acquire(key).await;
        let mut session = match self.load_session(key, upload_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, upload_id = %upload_id, "Cannot restore session after failed assembly");
                return;
            }
        };
        if session.status != UploadStatus::Assembling {
            return;
        }
        session.status = UploadStatus::InProgress;
        session.assembled_path = None;
        session.updated_at = Utc::now();
        if let Err(e) = self.save_session(key, &session).await {
            tracing::warn!(error = %e, upload_id = %upload_id, "Failed to restore session after failed assembly");
        }
    }

    /// Current progress. Expired sessions are reported as not found.
    pub async fn get_upload_status(
        &self,
        ns: &NamespaceContext,
        upload_id: Uuid,
    ) -> Result<UploadStatusReport, UploadError> {
        let session = self
            .load_session(&session_cache_key(ns, upload_id), upload_id)
            .await?;

        Ok(UploadStatusReport {
            upload_id,
            filename: session.filename.clone(),
            status: session.status,
            received_count: session.received_count(),
            total_chunks: session.total_chunks,
            missing_indices: session.missing_indices(),
            received_bytes: session.received_bytes(),
            total_size: session.total_size,
            progress_percent: session.progress_percent(),
            expires_at: session.expires_at,
        })
    }

    /// Indices already stored, so a client can continue without resending them.
    pub async fn resume_upload(
        &self,
        ns: &NamespaceContext,
        upload_id: Uuid,
    ) -> Result<ResumeInfo, UploadError> {
        let session = self
            .load_session(&session_cache_key(ns, upload_id), upload_id)
            .await?;

        Ok(ResumeInfo {
            upload_id,
            received_chunks: session.received_chunks.keys().copied().collect(),
            total_chunks: session.total_chunks,
            next_expected_index: session.next_expected_index(),
            chunk_size: UploadSession::chunk_size_hint(session.total_size, session.total_chunks),
            status: session.status,
        })
    }

    /// Delete scratch bytes and the session record.
    ///
    /// Returns `false` if there was nothing to cancel. A completed or assembling upload
    /// cannot be cancelled.
    #[tracing::instrument(skip(self, ns), fields(namespace = %ns.prefix()))]
    pub async fn cancel_upload(
        &self,
        ns: &NamespaceContext,
        upload_id: Uuid,
    ) -> Result<bool, UploadError> {
        let key = session_cache_key(ns, upload_id);
        let _guard = self.locks.acquire(&key).await;

        let session = match self.load_session(&key, upload_id).await {
            Ok(session) => session,
            Err(UploadError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        match session.status {
            UploadStatus::Completed | UploadStatus::Assembling => {
                return Err(UploadError::invalid_state(
                    upload_id,
                    session.status,
                    "upload can no longer be cancelled",
                ))
            }
            _ => {}
        }

        self.storage
            .delete_prefix(&scratch_prefix(&session.namespace, upload_id))
            .await?;
        let removed = self.sessions.forget(&key).await?;

        tracing::info!(
            upload_id = %upload_id,
            previous_status = %session.status,
            status = %UploadStatus::Cancelled,
            received = session.received_count(),
            "Chunked upload cancelled"
        );

        Ok(removed)
    }

    /// Evict expired session records and delete their scratch chunks. Returns how many
    /// sessions were purged.
    pub async fn purge_expired(&self) -> Result<usize, UploadError> {
        let evicted = self.sessions.evict_expired().await?;
        let mut purged = 0;

        for (key, raw) in evicted {
            if staffdesk_storage::keys::upload_id_from_session_key(&key).is_none() {
                continue;
            }
            let session: UploadSession = match serde_json::from_str(&raw) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Skipping unreadable expired session");
                    continue;
                }
            };
            if session.status == UploadStatus::Completed {
                purged += 1;
                continue;
            }
            let scratch = scratch_prefix(&session.namespace, session.upload_id);
            match self.storage.delete_prefix(&scratch).await {
                Ok(()) => purged += 1,
                Err(e) => {
                    tracing::warn!(error = %e, scratch = %scratch, "Failed to delete expired scratch chunks")
                }
            }
        }

        Ok(purged)
    }

    async fn load_session(&self, key: &str, upload_id: Uuid) -> Result<UploadSession, UploadError> {
        let session: UploadSession = get_json(self.sessions.as_ref(), key)
            .await?
            .ok_or(UploadError::NotFound(upload_id))?;
        if session.is_expired(Utc::now()) {
            return Err(UploadError::NotFound(upload_id));
        }
        Ok(session)
    }

    /// Persist `session` for whatever remains of its original TTL.
    async fn save_session(&self, key: &str, session: &UploadSession) -> Result<(), UploadError> {
        let remaining = (session.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return Err(UploadError::NotFound(session.upload_id));
        }
        put_json(self.sessions.as_ref(), key, session, remaining).await?;
        Ok(())
    }

    /// Whether a chunk written before the locked re-read failed with `err` belongs to no
    /// session. A running assembly may still read the index, so its bytes are kept.
    fn orphans_chunk(err: &UploadError) -> bool {
        match err {
            UploadError::NotFound(_) => true,
            UploadError::InvalidState { status, .. } => *status != UploadStatus::Assembling,
            _ => false,
        }
    }

    fn ensure_accepts_chunks(session: &UploadSession) -> Result<(), UploadError> {
        if session.status.accepts_chunks() {
            return Ok(());
        }
        let message = match session.status {
            UploadStatus::Assembling => "assembly has started",
            _ => "upload no longer accepts chunks",
        };
        Err(UploadError::invalid_state(
            session.upload_id,
            session.status,
            message,
        ))
    }

    /// Artifact path relative to the namespace: the explicit destination, else
    /// `folder/filename`, else `filename`.
    fn destination_for(
        &self,
        session: &UploadSession,
        destination_path: Option<&str>,
    ) -> Result<String, UploadError> {
        match destination_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => {
                validate_relative_path(path, "destination_path")?;
                Ok(path.to_string())
            }
            None => Ok(match session.folder.as_deref() {
                Some(folder) if !folder.is_empty() => format!("{}/{}", folder, session.filename),
                _ => session.filename.clone(),
            }),
        }
    }
}
