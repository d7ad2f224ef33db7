//! Application state and sub-state extractors.
//!
//! AppState is split into sub-states so handlers and middleware can extract only what they
//! need via Axum's `FromRef`.

use staffdesk_core::Config;
use staffdesk_infra::TenantResolver;
use staffdesk_services::ChunkedUploadService;
use staffdesk_storage::{CacheStore, Storage};
use staffdesk_worker::ErrorReportQueue;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

// ----- Sub-state types -----

/// Everything the tenancy middleware needs to scope a request.
#[derive(Clone)]
pub struct TenancyState {
    pub resolver: TenantResolver,
    /// Shared store; each request opens its own prefixed view over it.
    pub cache_store: Arc<dyn CacheStore>,
    /// Central prefix recorded before any tenant is bootstrapped.
    pub cache_prefix: String,
}

#[derive(Clone)]
pub struct UploadState {
    pub service: Arc<ChunkedUploadService>,
    pub storage: Arc<dyn Storage>,
}

#[derive(Clone)]
pub struct ReportingState {
    /// `None` disables forwarding; errors are still logged.
    pub queue: Option<ErrorReportQueue>,
    pub environment: String,
}

/// Main application state (composed of sub-states).
pub struct AppState {
    pub config: Config,
    pub tenancy: TenancyState,
    pub uploads: UploadState,
    pub reporting: ReportingState,
    /// Expired-session sweeper, aborted on shutdown. `None` when disabled.
    pub janitor: Mutex<Option<JoinHandle<()>>>,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for TenancyState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.tenancy.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for UploadState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.uploads.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ReportingState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.reporting.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
