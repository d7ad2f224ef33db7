//! Staffdesk Infrastructure Library
//!
//! This crate provides shared infrastructure used by the Staffdesk services:
//! - Tenancy (domain lookup, per-request cache namespace bootstrap/revert)
//! - Telemetry initialization
//! - Middleware (request ID)

pub mod middleware;
pub mod telemetry;
pub mod tenancy;

// Re-export commonly used types
pub use middleware::{get_request_id, request_id_middleware, RequestId};
pub use telemetry::{init_telemetry, shutdown_telemetry};
pub use tenancy::{
    CacheConnection, CacheManager, StaticTenantDirectory, TenantContextScope, TenantDirectory,
    TenantResolution, TenantResolver, TenantScopeGuard,
};
