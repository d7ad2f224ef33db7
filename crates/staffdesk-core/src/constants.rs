//! Application-wide constants.

/// Hard ceiling on the number of chunks a single upload may declare.
pub const MAX_TOTAL_CHUNKS: u32 = 10_000;

/// Default lifetime of an upload session before it expires.
pub const DEFAULT_UPLOAD_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Segment inserted between the original cache prefix and the tenant key.
pub const TENANT_PREFIX_SEGMENT: &str = "tenant_";

/// Default original cache-key prefix.
pub const DEFAULT_CACHE_PREFIX: &str = "staffdesk_cache_";

/// Maximum filename length accepted for uploads.
pub const MAX_FILENAME_LENGTH: usize = 255;
