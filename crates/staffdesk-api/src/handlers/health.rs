//! Health check handler.

use crate::error::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const STORAGE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "ok" when storage answered the probe, "degraded" otherwise
    pub status: String,
    pub cache_driver: String,
    pub storage: String,
}

/// Liveness plus a cheap storage probe. Not tenant scoped.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = ApiResponse<HealthStatus>),
        (status = 503, description = "Storage is unreachable", body = ApiResponse<HealthStatus>)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state.uploads.storage.exists("health/probe");
    let storage = match tokio::time::timeout(STORAGE_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => format!("unhealthy: {}", e),
        Err(_) => "timeout".to_string(),
    };

    let healthy = storage == "healthy";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!(storage = %storage, "Health check degraded");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ApiResponse::new(HealthStatus {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            cache_driver: state.tenancy.cache_store.driver_name().to_string(),
            storage,
        })),
    )
}
