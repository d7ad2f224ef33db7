//! OpenAPI document served at `/api/openapi.json`.

use crate::error::ErrorResponse;
use crate::handlers::chunked_upload::{
    AssembleUploadRequest, CancelUploadResponse, InitializeUploadRequest, UploadChunkForm,
};
use crate::handlers::health::HealthStatus;
use staffdesk_core::UploadStatus;
use staffdesk_services::{
    AssembledUpload, ChunkReceipt, InitializedUpload, ResumeInfo, UploadStatusReport,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staffdesk API",
        version = "0.1.0",
        description = "Tenant-scoped resumable chunked uploads. Clients initialize a session, send chunks in any order, check progress and assemble the final file."
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::chunked_upload::initialize_upload,
        crate::handlers::chunked_upload::upload_chunk,
        crate::handlers::chunked_upload::assemble_upload,
        crate::handlers::chunked_upload::get_upload_status,
        crate::handlers::chunked_upload::resume_upload,
        crate::handlers::chunked_upload::cancel_upload,
    ),
    components(schemas(
        InitializeUploadRequest,
        AssembleUploadRequest,
        UploadChunkForm,
        CancelUploadResponse,
        HealthStatus,
        ErrorResponse,
        InitializedUpload,
        ChunkReceipt,
        AssembledUpload,
        UploadStatusReport,
        ResumeInfo,
        UploadStatus,
    )),
    tags(
        (name = "uploads", description = "Chunked upload sessions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_upload_routes() {
        let doc = get_openapi_spec();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/uploads/chunked/initialize",
            "/api/v1/uploads/chunked/chunk",
            "/api/v1/uploads/chunked/assemble",
            "/api/v1/uploads/chunked/status/{upload_id}",
            "/api/v1/uploads/chunked/resume/{upload_id}",
            "/api/v1/uploads/chunked/cancel/{upload_id}",
            "/health",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
