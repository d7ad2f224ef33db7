//! Request middleware: tenant scoping and error reporting.

pub mod error_reporting;
pub mod tenancy;

pub use error_reporting::error_reporting_middleware;
pub use staffdesk_infra::request_id_middleware;
pub use tenancy::{tenant_context_middleware, RequestTenant};
