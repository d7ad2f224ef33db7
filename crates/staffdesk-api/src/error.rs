//! HTTP response envelopes and error conversion
//!
//! Every response body is `{ "success": bool, ... }`. Successful handlers return
//! `Json(ApiResponse::new(data))`; failures return `HttpAppError`, which renders the
//! error envelope, logs at the error's level and tags 5xx responses for reporting.
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>` and use
//! `?` on anything that converts into `AppError`.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection},
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use staffdesk_core::{AppError, ErrorMetadata, LogLevel};
use staffdesk_services::UploadError;
use staffdesk_storage::StorageError;
use utoipa::ToSchema;

/// Success envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether retrying the same call may succeed
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Upload the missing chunks")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Structured context, e.g. `missing_indices` for an incomplete upload
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<serde_json::Value>,
}

/// Attached to server-error responses so the reporting middleware can forward them.
#[derive(Debug, Clone)]
pub struct ReportedError {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from staffdesk-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<UploadError> for HttpAppError {
    fn from(err: UploadError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(err.into())
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app)
    }
}

/// Convert JSON body deserialization failures into a 400 with our error envelope.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<PathRejection> for HttpAppError {
    fn from(rejection: PathRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid path parameter: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartRejection> for HttpAppError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpAppError(AppError::BadRequest(format!(
            "Invalid multipart request: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(format!("Failed to read multipart field: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

/// JSON body extractor that returns our error envelope (400 + JSON) on deserialization failure.
/// Use this instead of `Json<T>` when you want a consistent API error shape for invalid bodies.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error.detailed_message(), error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    fn to_error_response(&self, is_production: bool) -> ErrorResponse {
        let app_error = &self.0;
        let hide_details = is_production || app_error.is_sensitive();

        ErrorResponse {
            success: false,
            message: app_error.client_message(),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            error_type: (!hide_details).then(|| app_error.error_type().to_string()),
            details: (!hide_details).then(|| app_error.detailed_message()),
            errors: app_error.context_fields(),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = self.to_error_response(is_production_env());
        let mut response = (status, Json(body)).into_response();

        if status.is_server_error() {
            response.extensions_mut().insert(ReportedError {
                status: status.as_u16(),
                code: app_error.error_code(),
                message: app_error.detailed_message(),
            });
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffdesk_core::UploadStatus;
    use uuid::Uuid;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("chunk".to_string()).into();
        assert!(matches!(app_err, AppError::NotFound(msg) if msg == "chunk"));
    }

    #[test]
    fn test_from_storage_error_upload_failed() {
        let HttpAppError(app_err) = StorageError::UploadFailed("disk full".to_string()).into();
        match app_err {
            AppError::Storage(msg) => assert!(msg.contains("disk full")),
            other => panic!("Expected Storage variant, got {other:?}"),
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let HttpAppError(app_err) = StorageError::InvalidKey("../x".to_string()).into();
        assert!(matches!(app_err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_incomplete_upload_envelope_lists_missing_indices() {
        let err = HttpAppError::from(UploadError::IncompleteUpload {
            missing_indices: vec![2, 4],
            received: 3,
            total: 5,
        });
        let body = serde_json::to_value(err.to_error_response(false)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UPLOAD_INCOMPLETE");
        assert_eq!(body["errors"]["missing_indices"], serde_json::json!([2, 4]));
        assert_eq!(body["error_type"], "IncompleteUploadError");
    }

    #[test]
    fn test_production_hides_details_but_keeps_context() {
        let err = HttpAppError::from(UploadError::Integrity {
            expected: 10,
            actual: 9,
        });
        let body = serde_json::to_value(err.to_error_response(true)).unwrap();
        assert!(body.get("details").is_none());
        assert!(body.get("error_type").is_none());
        assert_eq!(body["errors"]["expected_size"], 10);
    }

    #[test]
    fn test_server_errors_are_tagged_for_reporting() {
        let response =
            HttpAppError::from(UploadError::Storage(StorageError::UploadFailed("x".into())))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ReportedError>().is_some());

        let response = HttpAppError::from(UploadError::InvalidState {
            upload_id: Uuid::new_v4(),
            status: UploadStatus::Completed,
            message: "already assembled".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ReportedError>().is_none());
    }
}
