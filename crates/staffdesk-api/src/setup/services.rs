//! Service construction and shutdown

use crate::state::{AppState, ReportingState, TenancyState, UploadState};
use anyhow::{Context, Result};
use staffdesk_core::Config;
use staffdesk_infra::{StaticTenantDirectory, TenantResolver};
use staffdesk_services::{ChunkedUploadService, UploadConfig, UploadJanitor};
use staffdesk_storage::{create_cache_store, create_storage, CacheStore, Storage};
use staffdesk_worker::{
    ErrorReportQueue, ErrorReportQueueConfig, ErrorReporter, HttpErrorReporter, LogErrorReporter,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ERROR_REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build storage, cache, tenancy and upload services plus background workers.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let cache_store = create_cache_store(config)
        .await
        .context("Failed to initialize cache store")?;

    let queue = start_error_reporting(config)?;
    let state = build_state(config, cache_store, storage, Some(queue));

    let janitor_interval = config.upload_janitor_interval_secs();
    if janitor_interval > 0 {
        let janitor = Arc::new(UploadJanitor::new(
            state.uploads.service.clone(),
            Duration::from_secs(janitor_interval),
        ));
        let handle = janitor.start();
        *state
            .janitor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        tracing::info!(interval_secs = janitor_interval, "Upload janitor started");
    } else {
        tracing::info!("Upload janitor disabled; expired sessions are not purged");
    }

    Ok(state)
}

/// Assemble the application state from already-built backends.
pub fn build_state(
    config: &Config,
    cache_store: Arc<dyn CacheStore>,
    storage: Arc<dyn Storage>,
    queue: Option<ErrorReportQueue>,
) -> Arc<AppState> {
    let directory = Arc::new(StaticTenantDirectory::from_pairs(config.tenant_domains()));
    tracing::info!(
        tenants = directory.len(),
        central_domains = %config.central_domains().join(","),
        "Tenant directory loaded"
    );
    let resolver = TenantResolver::new(directory, config.central_domains());

    let service = Arc::new(ChunkedUploadService::new(
        cache_store.clone(),
        storage.clone(),
        UploadConfig::from_config(config),
    ));

    Arc::new(AppState {
        config: config.clone(),
        tenancy: TenancyState {
            resolver,
            cache_store,
            cache_prefix: config.cache_prefix().to_string(),
        },
        uploads: UploadState { service, storage },
        reporting: ReportingState {
            queue,
            environment: config.environment().to_string(),
        },
        janitor: Mutex::new(None),
    })
}

fn start_error_reporting(config: &Config) -> Result<ErrorReportQueue> {
    let reporter: Arc<dyn ErrorReporter> = match config.error_report_endpoint() {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Forwarding server errors to reporting endpoint");
            Arc::new(
                HttpErrorReporter::new(endpoint, ERROR_REPORT_TIMEOUT)
                    .context("Failed to build error reporter")?,
            )
        }
        None => Arc::new(LogErrorReporter),
    };

    let queue_config = ErrorReportQueueConfig {
        max_attempts: config.error_report_max_attempts(),
        backoff: Duration::from_secs(config.error_report_backoff_secs()),
        ..ErrorReportQueueConfig::default()
    };

    Ok(ErrorReportQueue::new(reporter, queue_config))
}

/// Stop background workers once the server has drained.
pub async fn shutdown_services(state: &AppState) {
    let janitor = state
        .janitor
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(handle) = janitor {
        handle.abort();
        tracing::info!("Upload janitor stopped");
    }
    if let Some(queue) = &state.reporting.queue {
        queue.shutdown().await;
    }
    tracing::info!("Services shut down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffdesk_core::config::{BaseConfig, StaffdeskConfig};
    use staffdesk_core::{CacheDriver, LogFormat};
    use staffdesk_storage::{LocalStorage, MemoryCacheStore};

    fn test_config(dir: &std::path::Path) -> Config {
        Config(Box::new(StaffdeskConfig {
            base: BaseConfig {
                server_port: 0,
                cors_origins: vec!["*".to_string()],
                environment: "test".to_string(),
                log_format: LogFormat::Pretty,
            },
            cache_prefix: "app_".to_string(),
            cache_driver: CacheDriver::Memory,
            cache_path: dir.join("cache"),
            storage_path: dir.join("storage"),
            storage_base_url: "http://localhost/files".to_string(),
            central_domains: vec!["localhost".to_string()],
            tenant_domains: vec![],
            upload_session_ttl_secs: 3600,
            upload_max_chunks: 10_000,
            upload_max_file_size_bytes: 1024 * 1024,
            upload_max_chunk_size_bytes: 1024,
            upload_janitor_interval_secs: 3600,
            error_report_endpoint: None,
            error_report_max_attempts: 1,
            error_report_backoff_secs: 0,
        }))
    }

    #[tokio::test]
    async fn test_shutdown_aborts_janitor() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/files".to_string())
                .await
                .unwrap(),
        );
        let state = build_state(
            &test_config(dir.path()),
            Arc::new(MemoryCacheStore::new()),
            storage,
            None,
        );

        let janitor = Arc::new(UploadJanitor::new(
            state.uploads.service.clone(),
            Duration::from_secs(3600),
        ));
        let handle = janitor.start();
        let abort = handle.abort_handle();
        *state.janitor.lock().unwrap() = Some(handle);

        shutdown_services(&state).await;

        assert!(state.janitor.lock().unwrap().is_none());
        for _ in 0..100 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
