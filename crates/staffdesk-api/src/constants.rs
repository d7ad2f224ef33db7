//! API constants

/// API base path prefix
pub const API_BASE: &str = "/api";

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v1";

/// Chunked upload routes, relative to [`API_PREFIX`]
pub const CHUNKED_UPLOADS_PATH: &str = "/uploads/chunked";

/// Room for multipart framing and the text fields around a chunk.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Default cap on in-flight HTTP requests
pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;
