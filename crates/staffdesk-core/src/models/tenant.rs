use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

use crate::constants::TENANT_PREFIX_SEGMENT;

/// Immutable identifier of a tenant, resolved from the request host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct TenantIdentity {
    key: String,
}

impl TenantIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Display for TenantIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.key)
    }
}

/// Cache namespace in effect for one request.
///
/// `original_prefix` is the central prefix recorded before any tenant was bootstrapped;
/// `active_prefix` is the tenant prefix installed on top of it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceContext {
    pub original_prefix: String,
    pub active_prefix: Option<String>,
}

impl NamespaceContext {
    /// Unscoped namespace using only the central prefix.
    pub fn central(prefix: impl Into<String>) -> Self {
        Self {
            original_prefix: prefix.into(),
            active_prefix: None,
        }
    }

    /// Namespace for `tenant` layered over `original_prefix`.
    pub fn for_tenant(original_prefix: impl Into<String>, tenant: &TenantIdentity) -> Self {
        let original_prefix = original_prefix.into();
        let active_prefix = tenant_prefix(&original_prefix, tenant);
        Self {
            original_prefix,
            active_prefix: Some(active_prefix),
        }
    }

    /// Prefix that cache keys must carry right now.
    pub fn prefix(&self) -> &str {
        self.active_prefix
            .as_deref()
            .unwrap_or(&self.original_prefix)
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.active_prefix.is_some()
    }

    /// Prefix `key` with the active namespace.
    pub fn cache_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix(), key)
    }
}

/// `original + "tenant_" + key + "_"`
pub fn tenant_prefix(original_prefix: &str, tenant: &TenantIdentity) -> String {
    format!(
        "{}{}{}_",
        original_prefix,
        TENANT_PREFIX_SEGMENT,
        tenant.key()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_prefix_layout() {
        let tenant = TenantIdentity::new("acme");
        assert_eq!(tenant_prefix("app_", &tenant), "app_tenant_acme_");
    }

    #[test]
    fn test_central_namespace_uses_original_prefix() {
        let ns = NamespaceContext::central("app_");
        assert_eq!(ns.prefix(), "app_");
        assert!(!ns.is_tenant_scoped());
        assert_eq!(ns.cache_key("k"), "app_k");
    }

    #[test]
    fn test_tenant_namespace_keeps_original() {
        let ns = NamespaceContext::for_tenant("app_", &TenantIdentity::new("globex"));
        assert_eq!(ns.original_prefix, "app_");
        assert_eq!(ns.prefix(), "app_tenant_globex_");
        assert_eq!(ns.cache_key("k"), "app_tenant_globex_k");
    }
}
