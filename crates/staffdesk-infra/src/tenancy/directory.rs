use async_trait::async_trait;
use staffdesk_core::{AppError, TenantIdentity};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Lookup of tenants by the domain they are served on.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>>;
}

/// Directory backed by a fixed domain to tenant table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantDirectory {
    domains: HashMap<String, TenantIdentity>,
}

impl StaticTenantDirectory {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let domains = pairs
            .iter()
            .map(|(domain, key)| (normalize_host(domain), TenantIdentity::new(key.clone())))
            .collect();
        Self { domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>> {
        Ok(self.domains.get(&normalize_host(domain)).cloned())
    }
}

/// Outcome of resolving a request host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    /// Host is a central (non-tenant) domain.
    Central,
    Tenant(TenantIdentity),
}

/// Lowercase host with any port and trailing dot removed.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // [::1]:4000
        rest.split(']').next().unwrap_or(rest)
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(host)
    } else {
        host
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

/// Maps request hosts to tenants, treating configured central domains as unscoped.
#[derive(Clone)]
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    central_domains: HashSet<String>,
}

impl TenantResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, central_domains: &[String]) -> Self {
        Self {
            directory,
            central_domains: central_domains.iter().map(|d| normalize_host(d)).collect(),
        }
    }

    pub fn is_central(&self, host: &str) -> bool {
        self.central_domains.contains(&normalize_host(host))
    }

    /// Resolve `host` to a tenant or the central context.
    ///
    /// Unknown hosts fail with [`AppError::TenantNotIdentified`]; the request must not
    /// fall through to the central namespace.
    pub async fn resolve(&self, host: &str) -> Result<TenantResolution, AppError> {
        let domain = normalize_host(host);
        if domain.is_empty() {
            return Err(AppError::TenantNotIdentified(
                "Request has no host".to_string(),
            ));
        }
        if self.central_domains.contains(&domain) {
            return Ok(TenantResolution::Central);
        }

        match self.directory.find_by_domain(&domain).await {
            Ok(Some(tenant)) => Ok(TenantResolution::Tenant(tenant)),
            Ok(None) => Err(AppError::TenantNotIdentified(format!(
                "No tenant is registered for domain '{}'",
                domain
            ))),
            Err(e) => Err(AppError::InternalWithSource {
                message: format!("Tenant lookup failed for domain '{}'", domain),
                source: e,
            }),
        }
    }
}
