//! Chunked upload handlers for large file uploads.
//!
//! Resumable uploads: the client initializes a session, sends chunks in any order (and
//! resends any that failed), then asks for assembly once status reports no missing indices.

use crate::error::{ApiResponse, ErrorResponse, HttpAppError, ValidatedJson};
use crate::middleware::RequestTenant;
use crate::state::UploadState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::PathRejection,
        Path, State,
    },
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use staffdesk_core::AppError;
use staffdesk_services::{
    AssembledUpload, ChunkReceipt, InitializedUpload, ResumeInfo, UploadMetadata,
    UploadStatusReport,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request to start a chunked upload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitializeUploadRequest {
    /// Original filename
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    /// Total file size in bytes
    #[validate(range(min = 1))]
    pub total_size: u64,
    /// Number of chunks the file is split into
    #[validate(range(min = 1, max = 10000))]
    pub total_chunks: u32,
    /// Content type (MIME type)
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Folder the artifact is stored under when no destination is given
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Request to assemble an upload
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssembleUploadRequest {
    pub upload_id: Uuid,
    /// Relative artifact path; defaults to `folder/filename`
    #[serde(default)]
    pub destination_path: Option<String>,
}

/// Multipart form of a chunk upload (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadChunkForm {
    pub upload_id: Uuid,
    /// Chunk index (0-based)
    pub chunk_index: u32,
    /// Chunk bytes
    #[schema(value_type = String, format = Binary)]
    pub chunk: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelUploadResponse {
    pub upload_id: Uuid,
    /// `false` when there was no live session to cancel
    pub cancelled: bool,
    pub message: String,
}

/// Start a chunked upload session
#[utoipa::path(
    post,
    path = "/api/v1/uploads/chunked/initialize",
    tag = "uploads",
    request_body = InitializeUploadRequest,
    responses(
        (status = 200, description = "Upload session created", body = ApiResponse<InitializedUpload>),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Unknown tenant domain", body = ErrorResponse)
    )
)]
pub async fn initialize_upload(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    ValidatedJson(request): ValidatedJson<InitializeUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let initialized = uploads
        .service
        .initialize_upload(
            &tenant_ctx.namespace,
            &request.filename,
            request.total_size,
            request.total_chunks,
            UploadMetadata {
                mime_type: request.mime_type,
                folder: request.folder,
                owner_id: request.owner_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::new(initialized)))
}

/// Upload a single chunk
#[utoipa::path(
    post,
    path = "/api/v1/uploads/chunked/chunk",
    tag = "uploads",
    request_body(content = UploadChunkForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk stored", body = ApiResponse<ChunkReceipt>),
        (status = 400, description = "Invalid chunk or upload state", body = ErrorResponse),
        (status = 404, description = "Upload session not found or expired", body = ErrorResponse),
        (status = 413, description = "Chunk too large", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut multipart = multipart?;
    let mut upload_id: Option<Uuid> = None;
    let mut chunk_index: Option<u32> = None;
    let mut chunk: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("upload_id") => {
                let text = field.text().await?;
                upload_id = Some(Uuid::parse_str(text.trim()).map_err(|_| {
                    AppError::InvalidInput(format!("upload_id is not a valid UUID: {}", text))
                })?);
            }
            Some("chunk_index") => {
                let text = field.text().await?;
                chunk_index = Some(text.trim().parse::<u32>().map_err(|_| {
                    AppError::InvalidInput(format!(
                        "chunk_index must be a non-negative integer: {}",
                        text
                    ))
                })?);
            }
            Some("chunk") => {
                chunk = Some(field.bytes().await?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let upload_id = upload_id
        .ok_or_else(|| AppError::InvalidInput("Missing field: upload_id".to_string()))?;
    let chunk_index = chunk_index
        .ok_or_else(|| AppError::InvalidInput("Missing field: chunk_index".to_string()))?;
    let chunk = chunk.ok_or_else(|| AppError::InvalidInput("Missing field: chunk".to_string()))?;

    let receipt = uploads
        .service
        .upload_chunk(&tenant_ctx.namespace, upload_id, chunk_index, chunk)
        .await?;

    Ok(Json(ApiResponse::new(receipt)))
}

/// Assemble all chunks into the final file
#[utoipa::path(
    post,
    path = "/api/v1/uploads/chunked/assemble",
    tag = "uploads",
    request_body = AssembleUploadRequest,
    responses(
        (status = 200, description = "Upload assembled", body = ApiResponse<AssembledUpload>),
        (status = 400, description = "Chunks missing, size mismatch or invalid state", body = ErrorResponse),
        (status = 404, description = "Upload session not found or expired", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn assemble_upload(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    ValidatedJson(request): ValidatedJson<AssembleUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let assembled = uploads
        .service
        .assemble_chunks(
            &tenant_ctx.namespace,
            request.upload_id,
            request.destination_path.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::new(assembled)))
}

/// Get upload progress
#[utoipa::path(
    get,
    path = "/api/v1/uploads/chunked/status/{upload_id}",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session ID")),
    responses(
        (status = 200, description = "Upload status", body = ApiResponse<UploadStatusReport>),
        (status = 404, description = "Upload session not found or expired", body = ErrorResponse)
    )
)]
pub async fn get_upload_status(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(upload_id) = path?;
    let status = uploads
        .service
        .get_upload_status(&tenant_ctx.namespace, upload_id)
        .await?;

    Ok(Json(ApiResponse::new(status)))
}

/// List the chunks already stored so an interrupted upload can continue
#[utoipa::path(
    get,
    path = "/api/v1/uploads/chunked/resume/{upload_id}",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session ID")),
    responses(
        (status = 200, description = "Resume information", body = ApiResponse<ResumeInfo>),
        (status = 404, description = "Upload session not found or expired", body = ErrorResponse)
    )
)]
pub async fn resume_upload(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(upload_id) = path?;
    let resume = uploads
        .service
        .resume_upload(&tenant_ctx.namespace, upload_id)
        .await?;

    Ok(Json(ApiResponse::new(resume)))
}

/// Cancel an upload and discard its chunks
#[utoipa::path(
    post,
    path = "/api/v1/uploads/chunked/cancel/{upload_id}",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session ID")),
    responses(
        (status = 200, description = "Cancellation result", body = ApiResponse<CancelUploadResponse>),
        (status = 400, description = "Upload already completed", body = ErrorResponse)
    )
)]
pub async fn cancel_upload(
    tenant_ctx: RequestTenant,
    State(uploads): State<UploadState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(upload_id) = path?;
    let cancelled = uploads
        .service
        .cancel_upload(&tenant_ctx.namespace, upload_id)
        .await?;

    let message = if cancelled {
        "Upload cancelled"
    } else {
        "Upload not found or already cancelled"
    };

    Ok(Json(ApiResponse::new(CancelUploadResponse {
        upload_id,
        cancelled,
        message: message.to_string(),
    })))
}
