//! Gateway configuration, read from the environment at startup.

use crate::deadline::DEFAULT_BACKEND_TIMEOUT;
use crate::orchestrator::{DEFAULT_K, DEFAULT_MAX_K};
use crate::rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Startup configuration problems. These are fatal; they never surface per request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid { key: &'static str, value: String, reason: String },
}

/// Which metadata backend to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// Line-delimited JSON file loaded once at startup.
    File(PathBuf),
    /// Postgres `claim_metadata` table.
    Postgres { url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub metadata: MetadataSource,
    pub redis_url: String,
    pub vector_search_addr: String,
    pub default_k: u32,
    pub max_k: u32,
    pub backend_timeout: Duration,
    /// Limit enforced by the middleware chain.
    pub middleware_limit: RateLimitConfig,
    /// Limit enforced by the search endpoint.
    pub search_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            metadata: MetadataSource::File(PathBuf::from("metadata.jsonl")),
            redis_url: "redis://127.0.0.1:6379".into(),
            vector_search_addr: "http://127.0.0.1:50051".into(),
            default_k: DEFAULT_K,
            max_k: DEFAULT_MAX_K,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            middleware_limit: RateLimitConfig::middleware(),
            search_limit: RateLimitConfig::search_endpoint(),
        }
    }
}

impl GatewayConfig {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(bind) = lookup("CLAIMGATE_BIND") {
            cfg.bind = parse("CLAIMGATE_BIND", &bind)?;
        }
        if let Some(url) = lookup("REDIS_URL") {
            cfg.redis_url = url;
        }
        if let Some(addr) = lookup("CLAIMGATE_VECTOR_SEARCH_ADDR") {
            cfg.vector_search_addr = addr;
        }
        if let Some(k) = lookup("CLAIMGATE_SEARCH_K") {
            cfg.default_k = parse("CLAIMGATE_SEARCH_K", &k)?;
        }
        if let Some(max_k) = lookup("CLAIMGATE_SEARCH_MAX_K") {
            cfg.max_k = parse("CLAIMGATE_SEARCH_MAX_K", &max_k)?;
        }
        if let Some(ms) = lookup("CLAIMGATE_BACKEND_TIMEOUT_MS") {
            let ms: u64 = parse("CLAIMGATE_BACKEND_TIMEOUT_MS", &ms)?;
            if ms == 0 {
                return Err(invalid("CLAIMGATE_BACKEND_TIMEOUT_MS", "0", "must be non-zero"));
            }
            cfg.backend_timeout = Duration::from_millis(ms);
        }
        if cfg.default_k == 0 || cfg.default_k > cfg.max_k {
            return Err(invalid(
                "CLAIMGATE_SEARCH_K",
                &cfg.default_k.to_string(),
                "must be between 1 and the max k",
            ));
        }

        let backend = lookup("CLAIMGATE_METADATA_BACKEND").unwrap_or_else(|| "file".into());
        cfg.metadata = match backend.as_str() {
            "file" => MetadataSource::File(
                lookup("CLAIMGATE_METADATA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("metadata.jsonl")),
            ),
            "postgres" => {
                let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let max_connections = match lookup("CLAIMGATE_DB_MAX_CONNECTIONS") {
                    Some(raw) => parse("CLAIMGATE_DB_MAX_CONNECTIONS", &raw)?,
                    None => 25,
                };
                MetadataSource::Postgres { url, max_connections }
            }
            other => {
                return Err(invalid(
                    "CLAIMGATE_METADATA_BACKEND",
                    other,
                    "expected `file` or `postgres`",
                ))
            }
        };

        Ok(cfg)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| invalid(key, raw, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.to_string() }
}
