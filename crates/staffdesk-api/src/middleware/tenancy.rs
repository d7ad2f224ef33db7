use crate::error::HttpAppError;
use crate::state::TenancyState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::HOST, request::Parts},
    middleware::Next,
    response::Response,
};
use staffdesk_core::{AppError, NamespaceContext, TenantIdentity};
use staffdesk_infra::{CacheManager, TenantResolution, TenantScopeGuard};
use std::sync::Arc;
use tracing::Instrument;

/// Tenant and cache namespace of the current request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestTenant {
    /// `None` on central domains.
    pub tenant: Option<TenantIdentity>,
    pub namespace: NamespaceContext,
}

impl RequestTenant {
    pub fn tenant_key(&self) -> Option<&str> {
        self.tenant.as_ref().map(TenantIdentity::key)
    }
}

// Extracted from parts so it can be combined with Multipart
impl<S> FromRequestParts<S> for RequestTenant
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestTenant>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Internal(
                    "Tenant context missing; route is not behind the tenancy middleware"
                        .to_string(),
                ))
            })
    }
}

fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Resolve the tenant from the request host and scope the cache namespace to it for the
/// rest of the request.
///
/// Each request gets its own [`CacheManager`], so concurrent requests for different tenants
/// never observe each other's prefix. The scope guard reverts on every exit path.
pub async fn tenant_context_middleware(
    State(tenancy): State<TenancyState>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let host = request_host(&request);
    let tenant = match tenancy.resolver.resolve(&host).await? {
        TenantResolution::Central => None,
        TenantResolution::Tenant(tenant) => Some(tenant),
    };

    let manager = Arc::new(CacheManager::new(
        tenancy.cache_store.clone(),
        tenancy.cache_prefix.clone(),
    ));
    let guard = TenantScopeGuard::enter(manager, tenant.as_ref());
    let context = RequestTenant {
        namespace: guard.namespace(),
        tenant,
    };

    let span = tracing::info_span!(
        "tenant_scope",
        tenant = context.tenant_key().unwrap_or("central"),
        namespace = %context.namespace.prefix(),
    );
    request.extensions_mut().insert(context);

    let response = next.run(request).instrument(span).await;
    drop(guard);
    Ok(response)
}
