//! Configuration module
//!
//! This module provides configuration for the API and services: server settings,
//! cache and storage backends, tenancy domains, upload limits and error reporting.

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_CACHE_PREFIX, DEFAULT_UPLOAD_SESSION_TTL_SECS, MAX_TOTAL_CHUNKS};

// Common constants
const SERVER_PORT: u16 = 4000;
const UPLOAD_MAX_FILE_SIZE_MB: u64 = 5 * 1024;
const UPLOAD_MAX_CHUNK_SIZE_MB: u64 = 50;
const ERROR_REPORT_MAX_ATTEMPTS: u32 = 3;
const ERROR_REPORT_BACKOFF_SECS: u64 = 10;

/// Backend holding upload session metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheDriver {
    Memory,
    File,
}

impl CacheDriver {
    pub fn parse(value: &str) -> Result<Self, anyhow::Error> {
        match value.trim().to_lowercase().as_str() {
            "memory" | "array" => Ok(CacheDriver::Memory),
            "file" => Ok(CacheDriver::File),
            other => Err(anyhow::anyhow!(
                "CACHE_DRIVER must be 'memory' or 'file', got '{}'",
                other
            )),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Full application settings
#[derive(Clone, Debug)]
pub struct StaffdeskConfig {
    pub base: BaseConfig,
    // Cache configuration
    pub cache_prefix: String,
    pub cache_driver: CacheDriver,
    pub cache_path: PathBuf,
    // Storage configuration
    pub storage_path: PathBuf,
    pub storage_base_url: String,
    // Tenancy
    pub central_domains: Vec<String>,
    /// (domain, tenant key) pairs
    pub tenant_domains: Vec<(String, String)>,
    // Upload limits
    pub upload_session_ttl_secs: u64,
    pub upload_max_chunks: u32,
    pub upload_max_file_size_bytes: u64,
    pub upload_max_chunk_size_bytes: u64,
    /// Interval between janitor sweeps. 0 = disabled.
    pub upload_janitor_interval_secs: u64,
    // Error reporting
    pub error_report_endpoint: Option<String>,
    pub error_report_max_attempts: u32,
    pub error_report_backoff_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<StaffdeskConfig>);

impl Config {
    fn inner(&self) -> &StaffdeskConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = StaffdeskConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().base.log_format
    }

    pub fn cache_prefix(&self) -> &str {
        &self.inner().cache_prefix
    }

    pub fn cache_driver(&self) -> CacheDriver {
        self.inner().cache_driver
    }

    pub fn cache_path(&self) -> &PathBuf {
        &self.inner().cache_path
    }

    pub fn storage_path(&self) -> &PathBuf {
        &self.inner().storage_path
    }

    pub fn storage_base_url(&self) -> &str {
        &self.inner().storage_base_url
    }

    pub fn central_domains(&self) -> &[String] {
        &self.inner().central_domains
    }

    pub fn tenant_domains(&self) -> &[(String, String)] {
        &self.inner().tenant_domains
    }

    pub fn upload_session_ttl_secs(&self) -> u64 {
        self.inner().upload_session_ttl_secs
    }

    pub fn upload_max_chunks(&self) -> u32 {
        self.inner().upload_max_chunks
    }

    pub fn upload_max_file_size_bytes(&self) -> u64 {
        self.inner().upload_max_file_size_bytes
    }

    pub fn upload_max_chunk_size_bytes(&self) -> u64 {
        self.inner().upload_max_chunk_size_bytes
    }

    pub fn upload_janitor_interval_secs(&self) -> u64 {
        self.inner().upload_janitor_interval_secs
    }

    pub fn error_report_endpoint(&self) -> Option<&str> {
        self.inner().error_report_endpoint.as_deref()
    }

    pub fn error_report_max_attempts(&self) -> u32 {
        self.inner().error_report_max_attempts
    }

    pub fn error_report_backoff_secs(&self) -> u64 {
        self.inner().error_report_backoff_secs
    }
}

impl StaffdeskConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins: parse_list(&cors_origins_str),
            environment,
            log_format,
        };

        let cache_driver =
            CacheDriver::parse(&env::var("CACHE_DRIVER").unwrap_or_else(|_| "memory".to_string()))?;

        let tenant_domains =
            parse_tenant_domains(&env::var("TENANT_DOMAINS").unwrap_or_default())?;

        let max_file_size_mb = env::var("UPLOAD_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| UPLOAD_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(UPLOAD_MAX_FILE_SIZE_MB);

        let max_chunk_size_mb = env::var("UPLOAD_MAX_CHUNK_SIZE_MB")
            .unwrap_or_else(|_| UPLOAD_MAX_CHUNK_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(UPLOAD_MAX_CHUNK_SIZE_MB);

        Ok(StaffdeskConfig {
            base,
            cache_prefix: env::var("CACHE_PREFIX")
                .unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_string()),
            cache_driver,
            cache_path: env::var("CACHE_PATH")
                .unwrap_or_else(|_| "./storage/cache".to_string())
                .into(),
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./storage/app".to_string())
                .into(),
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/files".to_string()),
            central_domains: parse_list(
                &env::var("CENTRAL_DOMAINS").unwrap_or_else(|_| "localhost,127.0.0.1".to_string()),
            ),
            tenant_domains,
            upload_session_ttl_secs: env::var("UPLOAD_SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_UPLOAD_SESSION_TTL_SECS),
            upload_max_chunks: env::var("UPLOAD_MAX_CHUNKS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(MAX_TOTAL_CHUNKS)
                .min(MAX_TOTAL_CHUNKS),
            upload_max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            upload_max_chunk_size_bytes: max_chunk_size_mb * 1024 * 1024,
            upload_janitor_interval_secs: env::var("UPLOAD_JANITOR_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            error_report_endpoint: env::var("ERROR_REPORT_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            error_report_max_attempts: env::var("ERROR_REPORT_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(ERROR_REPORT_MAX_ATTEMPTS),
            error_report_backoff_secs: env::var("ERROR_REPORT_BACKOFF_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(ERROR_REPORT_BACKOFF_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_session_ttl_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_SESSION_TTL_SECS must be greater than 0"));
        }

        if self.upload_max_chunks == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_CHUNKS must be at least 1"));
        }

        if self.upload_max_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_CHUNK_SIZE_MB must be at least 1"));
        }

        if self.error_report_max_attempts == 0 {
            return Err(anyhow::anyhow!("ERROR_REPORT_MAX_ATTEMPTS must be at least 1"));
        }

        for (domain, _) in &self.tenant_domains {
            if self.central_domains.iter().any(|c| c == domain) {
                return Err(anyhow::anyhow!(
                    "Domain '{}' is configured both as central and as a tenant domain",
                    domain
                ));
            }
        }

        Ok(())
    }
}

fn is_production_env_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `domain=tenant,domain=tenant` pairs.
pub fn parse_tenant_domains(value: &str) -> Result<Vec<(String, String)>, anyhow::Error> {
    let mut pairs = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (domain, tenant) = entry.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("TENANT_DOMAINS entry '{}' must be domain=tenant_key", entry)
        })?;
        let domain = domain.trim().to_lowercase();
        let tenant = tenant.trim().to_string();
        if domain.is_empty() || tenant.is_empty() {
            return Err(anyhow::anyhow!(
                "TENANT_DOMAINS entry '{}' has an empty domain or tenant key",
                entry
            ));
        }
        pairs.push((domain, tenant));
    }
    Ok(pairs)
}
