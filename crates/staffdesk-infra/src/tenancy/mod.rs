//! Multi-tenant context: which tenant a request belongs to and which cache namespace it
//! may touch.

mod directory;
mod manager;
mod scope;

pub use directory::{
    normalize_host, StaticTenantDirectory, TenantDirectory, TenantResolution, TenantResolver,
};
pub use manager::{CacheConnection, CacheManager};
pub use scope::{TenantContextScope, TenantScopeGuard};
