use super::CacheManager;
use staffdesk_core::models::tenant::tenant_prefix;
use staffdesk_core::{NamespaceContext, TenantIdentity};
use std::sync::Arc;

/// Scopes a [`CacheManager`] to one tenant and restores it afterwards.
///
/// The prefix in place before the first `bootstrap` is recorded once. Later bootstraps
/// layer the new tenant over that same original, so `revert` always returns to the
/// pre-tenant prefix no matter how many tenants were switched through.
pub struct TenantContextScope {
    manager: Arc<CacheManager>,
    original_prefix: Option<String>,
    tenant: Option<TenantIdentity>,
}

impl TenantContextScope {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self {
            manager,
            original_prefix: None,
            tenant: None,
        }
    }

    /// Install `tenant`'s prefix and invalidate the open cache connection.
    pub fn bootstrap(&mut self, tenant: &TenantIdentity) {
        let original = self
            .original_prefix
            .get_or_insert_with(|| self.manager.prefix())
            .clone();
        let prefix = tenant_prefix(&original, tenant);

        self.manager.set_prefix(prefix.clone());
        self.manager.forget_connection();
        self.tenant = Some(tenant.clone());

        tracing::debug!(tenant = %tenant, prefix = %prefix, "Tenant cache namespace bootstrapped");
    }

    /// Restore the recorded original prefix. No-op if never bootstrapped.
    pub fn revert(&mut self) {
        let Some(original) = self.original_prefix.take() else {
            return;
        };
        self.manager.set_prefix(original.clone());
        self.manager.forget_connection();
        if let Some(tenant) = self.tenant.take() {
            tracing::debug!(tenant = %tenant, prefix = %original, "Tenant cache namespace reverted");
        }
    }

    pub fn tenant(&self) -> Option<&TenantIdentity> {
        self.tenant.as_ref()
    }

    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    /// Namespace currently in effect.
    pub fn namespace(&self) -> NamespaceContext {
        match (&self.original_prefix, &self.tenant) {
            (Some(original), Some(tenant)) => NamespaceContext::for_tenant(original.clone(), tenant),
            _ => NamespaceContext::central(self.manager.prefix()),
        }
    }
}

/// Tenant scope that reverts when dropped, including on early return or panic unwind.
pub struct TenantScopeGuard {
    scope: TenantContextScope,
}

impl TenantScopeGuard {
    /// Enter `tenant`'s scope, or stay central when `tenant` is `None`.
    pub fn enter(manager: Arc<CacheManager>, tenant: Option<&TenantIdentity>) -> Self {
        let mut scope = TenantContextScope::new(manager);
        if let Some(tenant) = tenant {
            scope.bootstrap(tenant);
        }
        Self { scope }
    }

    pub fn namespace(&self) -> NamespaceContext {
        self.scope.namespace()
    }

    pub fn tenant(&self) -> Option<&TenantIdentity> {
        self.scope.tenant()
    }
}

impl Drop for TenantScopeGuard {
    fn drop(&mut self) {
        self.scope.revert();
    }
}
