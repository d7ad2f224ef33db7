//! Shared key generation for storage and cache backends.
//!
//! Every key is derived from the request's [`NamespaceContext`], so two tenants can never
//! address each other's session records, scratch chunks or artifacts.

use staffdesk_core::NamespaceContext;
use uuid::Uuid;

const SCRATCH_ROOT: &str = "scratch";
const FILES_ROOT: &str = "files";
const EMPTY_PREFIX_SEGMENT: &str = "%";
const SESSION_KEY_SEGMENT: &str = "upload_session:";

/// Filesystem-safe directory name for a cache prefix.
///
/// The mapping is injective: the prefix is percent-encoded and `.` is escaped as well, so
/// `app_tenant_acme.hr_` and `app_tenant_acme-hr_` never share a directory and a segment
/// can never contain `..`. The empty prefix maps to `%`, which no encoded prefix produces.
pub fn namespace_segment(prefix: &str) -> String {
    if prefix.is_empty() {
        return EMPTY_PREFIX_SEGMENT.to_string();
    }
    urlencoding::encode(prefix).replace('.', "%2E")
}

/// Cache key of an upload session record.
pub fn session_cache_key(ns: &NamespaceContext, upload_id: Uuid) -> String {
    ns.cache_key(&format!("{}{}", SESSION_KEY_SEGMENT, upload_id))
}

/// Scratch directory holding the chunks of one upload.
pub fn scratch_prefix(namespace_prefix: &str, upload_id: Uuid) -> String {
    format!(
        "{}/{}/{}",
        SCRATCH_ROOT,
        namespace_segment(namespace_prefix),
        upload_id
    )
}

/// Storage key of a single chunk. Indices are zero-padded so keys sort in assembly order.
pub fn chunk_key(namespace_prefix: &str, upload_id: Uuid, chunk_index: u32) -> String {
    format!(
        "{}/{:05}.part",
        scratch_prefix(namespace_prefix, upload_id),
        chunk_index
    )
}

/// Storage key of an assembled artifact at `relative_path` within the namespace.
pub fn artifact_key(namespace_prefix: &str, relative_path: &str) -> String {
    format!(
        "{}/{}/{}",
        FILES_ROOT,
        namespace_segment(namespace_prefix),
        relative_path.trim_start_matches('/')
    )
}

/// Upload id from a session cache key, if the key is one.
pub fn upload_id_from_session_key(cache_key: &str) -> Option<Uuid> {
    let (_, id) = cache_key.rsplit_once(SESSION_KEY_SEGMENT)?;
    Uuid::parse_str(id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffdesk_core::TenantIdentity;

    #[test]
    fn test_namespace_segment() {
        assert_eq!(
            namespace_segment("staffdesk_cache_tenant_acme_"),
            "staffdesk_cache_tenant_acme_"
        );
        assert_eq!(namespace_segment("a:b/c_"), "a%3Ab%2Fc_");
        assert_eq!(namespace_segment("a..b_"), "a%2E%2Eb_");
        assert_eq!(namespace_segment(""), "%");
    }

    #[test]
    fn test_lookalike_tenants_get_distinct_segments() {
        let segment = |key: &str| {
            let ns = NamespaceContext::for_tenant("app_", &TenantIdentity::new(key));
            namespace_segment(ns.prefix())
        };
        let pairs = [
            ("acme.hr", "acme-hr"),
            ("acme", "acme_"),
            ("acme/hr", "acme-hr"),
            ("acme%2Ehr", "acme.hr"),
        ];
        for (a, b) in pairs {
            assert_ne!(segment(a), segment(b), "{a} and {b} share a segment");
        }

        let id = Uuid::nil();
        let a = NamespaceContext::for_tenant("app_", &TenantIdentity::new("acme.hr"));
        let b = NamespaceContext::for_tenant("app_", &TenantIdentity::new("acme-hr"));
        assert_ne!(
            artifact_key(a.prefix(), "pay.pdf"),
            artifact_key(b.prefix(), "pay.pdf")
        );
        assert_ne!(scratch_prefix(a.prefix(), id), scratch_prefix(b.prefix(), id));
        assert_ne!(namespace_segment(""), namespace_segment("%"));
    }

    #[test]
    fn test_keys_differ_per_tenant() {
        let id = Uuid::new_v4();
        let a = NamespaceContext::for_tenant("app_", &TenantIdentity::new("a"));
        let b = NamespaceContext::for_tenant("app_", &TenantIdentity::new("b"));

        assert_ne!(session_cache_key(&a, id), session_cache_key(&b, id));
        assert_ne!(chunk_key(a.prefix(), id, 0), chunk_key(b.prefix(), id, 0));
        assert_ne!(
            artifact_key(a.prefix(), "x.pdf"),
            artifact_key(b.prefix(), "x.pdf")
        );
    }

    #[test]
    fn test_chunk_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            chunk_key("app_tenant_acme_", id, 7),
            format!("scratch/app_tenant_acme_/{}/00007.part", id)
        );
    }

    #[test]
    fn test_upload_id_round_trip_from_session_key() {
        let id = Uuid::new_v4();
        let ns = NamespaceContext::central("app_");
        let key = session_cache_key(&ns, id);
        assert_eq!(upload_id_from_session_key(&key), Some(id));
        assert_eq!(upload_id_from_session_key("app_other"), None);
    }
}
