//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p staffdesk-api`.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use staffdesk_api::constants;
use staffdesk_api::setup::{routes, services};
use staffdesk_core::config::{BaseConfig, StaffdeskConfig};
use staffdesk_core::{CacheDriver, Config, LogFormat};
use staffdesk_storage::{CacheStore, LocalStorage, MemoryCacheStore, Storage};
use std::sync::Arc;
use tempfile::TempDir;

pub const ACME_HOST: &str = "acme.example.com";
pub const GLOBEX_HOST: &str = "globex.example.com";
pub const CENTRAL_HOST: &str = "localhost";

/// Chunk size limit used by the test app, small enough to hit in a test.
pub const TEST_MAX_CHUNK_SIZE: u64 = 1024 * 1024;

/// Upload path under the versioned API prefix (e.g. `/api/v1/uploads/chunked/initialize`).
pub fn api_path(path: &str) -> String {
    format!(
        "{}{}{}",
        constants::API_PREFIX,
        constants::CHUNKED_UPLOADS_PATH,
        path
    )
}

/// Test application: server and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn test_config(temp_dir: &TempDir, session_ttl_secs: u64) -> Config {
    Config(Box::new(StaffdeskConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: LogFormat::Pretty,
        },
        cache_prefix: "app_".to_string(),
        cache_driver: CacheDriver::Memory,
        cache_path: temp_dir.path().join("cache"),
        storage_path: temp_dir.path().join("storage"),
        storage_base_url: "http://localhost:4000/storage".to_string(),
        central_domains: vec![CENTRAL_HOST.to_string()],
        tenant_domains: vec![
            (ACME_HOST.to_string(), "acme".to_string()),
            (GLOBEX_HOST.to_string(), "globex".to_string()),
        ],
        upload_session_ttl_secs: session_ttl_secs,
        upload_max_chunks: 10_000,
        upload_max_file_size_bytes: 100 * 1024 * 1024,
        upload_max_chunk_size_bytes: TEST_MAX_CHUNK_SIZE,
        upload_janitor_interval_secs: 0,
        error_report_endpoint: None,
        error_report_max_attempts: 1,
        error_report_backoff_secs: 0,
    }))
}

/// Setup test app with in-memory sessions and local storage in a temp directory.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_session_ttl(3600).await
}

/// Same as [`setup_test_app`] with sessions that expire after `session_ttl_secs`.
pub async fn setup_test_app_with_session_ttl(session_ttl_secs: u64) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&temp_dir, session_ttl_secs);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            config.storage_path().clone(),
            config.storage_base_url().to_string(),
        )
        .await
        .expect("Failed to create local storage"),
    );
    let cache_store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

    let state = services::build_state(&config, cache_store, storage.clone(), None);
    let app = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        _temp_dir: temp_dir,
    }
}

/// Start a session on `host` and return the response data.
pub async fn initialize(
    client: &TestServer,
    host: &str,
    filename: &str,
    total_size: u64,
    total_chunks: u32,
) -> Value {
    let response = client
        .post(&api_path("/initialize"))
        .add_header("Host", host)
        .json(&json!({
            "filename": filename,
            "total_size": total_size,
            "total_chunks": total_chunks,
            "mime_type": "application/octet-stream",
            "folder": "documents"
        }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    response.json::<Value>()["data"].clone()
}

/// Send one chunk as multipart form data.
pub async fn send_chunk(
    client: &TestServer,
    host: &str,
    upload_id: &str,
    index: u32,
    data: Vec<u8>,
) -> TestResponse {
    let form = MultipartForm::new()
        .add_text("upload_id", upload_id.to_string())
        .add_text("chunk_index", index.to_string())
        .add_part(
            "chunk",
            Part::bytes(bytes::Bytes::from(data))
                .file_name(format!("chunk-{}", index))
                .mime_type("application/octet-stream"),
        );

    client
        .post(&api_path("/chunk"))
        .add_header("Host", host)
        .multipart(form)
        .await
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Error body with `upload_id` masked, so bodies for different ids can be compared.
pub fn mask_upload_id(body: &Value, upload_id: &str) -> Value {
    let raw = body.to_string().replace(upload_id, "<upload_id>");
    serde_json::from_str(&raw).expect("masked body is valid JSON")
}
