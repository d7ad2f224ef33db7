//! Route configuration and setup

use crate::api_doc;
use crate::constants::{
    API_BASE, API_PREFIX, CHUNKED_UPLOADS_PATH, DEFAULT_HTTP_CONCURRENCY_LIMIT,
    MULTIPART_OVERHEAD_BYTES,
};
use crate::handlers::{chunked_upload, health};
use crate::middleware::{
    error_reporting_middleware, request_id_middleware, tenant_context_middleware,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use staffdesk_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = public_routes()
        .nest(
            &format!("{}{}", API_PREFIX, CHUNKED_UPLOADS_PATH),
            upload_routes(config, &state),
        )
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Routes that do not depend on the request's tenant
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            &format!("{}/openapi.json", API_BASE),
            get(|| async { Json(api_doc::get_openapi_spec()) }),
        )
}

/// Tenant-scoped upload routes
///
/// Layer order matters: the tenancy middleware runs first so the reporting middleware
/// can tag reports with the resolved tenant.
fn upload_routes(config: &Config, state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let body_limit = usize::try_from(config.upload_max_chunk_size_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/initialize", post(chunked_upload::initialize_upload))
        .route("/chunk", post(chunked_upload::upload_chunk))
        .route("/assemble", post(chunked_upload::assemble_upload))
        .route("/status/{upload_id}", get(chunked_upload::get_upload_status))
        .route("/resume/{upload_id}", get(chunked_upload::resume_upload))
        .route("/cancel/{upload_id}", post(chunked_upload::cancel_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.reporting.clone(),
            error_reporting_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.tenancy.clone(),
            tenant_context_middleware,
        ))
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
