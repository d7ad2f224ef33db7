//! Staffdesk API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application setup.

mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod setup;

pub mod error;
pub mod state;

pub use error::{ApiResponse, ErrorResponse, HttpAppError};
pub use middleware::RequestTenant;
