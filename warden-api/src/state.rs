//! App state: allowlist store, trusted-IP cache, config.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use warden_cache::{CacheConfig, TrustedIpCache};
use warden_core::error::{Result, WardenError};
use warden_core::traits::AllowlistStore;
use warden_store::{LibsqlStore, MemoryStore};

use crate::admin::AllowlistAdmin;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub database_url: Option<String>,
    pub database_auth_token: String,
    pub cache: CacheConfig,
    pub trust_forwarded_for: bool,
    /// Proxies in front of the server that append to `X-Forwarded-For`.
    pub trusted_proxy_hops: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_auth_token: String::new(),
            cache: CacheConfig::default(),
            trust_forwarded_for: false,
            trusted_proxy_hops: 1,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = CacheConfig::default();

        Self {
            database_url: std::env::var("TURSO_DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            database_auth_token: std::env::var("TURSO_AUTH_TOKEN").unwrap_or_default(),
            cache: CacheConfig {
                ttl_seconds: env_or("TRUSTED_IP_CACHE_TTL", defaults.ttl_seconds),
                query_timeout_ms: env_or("TRUSTED_IP_QUERY_TIMEOUT_MS", defaults.query_timeout_ms),
                fallback_ips: std::env::var("TRUSTED_IP_FALLBACK")
                    .map(|v| parse_ip_list(&v))
                    .unwrap_or(defaults.fallback_ips),
            },
            trust_forwarded_for: std::env::var("TRUST_FORWARDED_FOR")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            trusted_proxy_hops: env_or("TRUSTED_PROXY_HOPS", 1),
        }
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.query_timeout_ms == 0 {
            return Err(WardenError::ConfigError(
                "TRUSTED_IP_QUERY_TIMEOUT_MS must be greater than zero".into(),
            ));
        }
        if self.trust_forwarded_for && self.trusted_proxy_hops == 0 {
            return Err(WardenError::ConfigError(
                "TRUSTED_PROXY_HOPS must be at least 1 when TRUST_FORWARDED_FOR is set".into(),
            ));
        }
        Ok(())
    }

    /// Number of `X-Forwarded-For` entries appended by trusted proxies;
    /// zero when the header is ignored.
    pub fn forwarded_hops(&self) -> usize {
        if self.trust_forwarded_for {
            self.trusted_proxy_hops
        } else {
            0
        }
    }
}

/// Reads a numeric variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Invalid value, using default");
            default
        }),
        _ => default,
    }
}

fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub struct AppState {
    pub config: ApiConfig,
    pub admin: AllowlistAdmin,
}

impl AppState {
    /// Builds state over `store`, with a cache reading from the same store.
    pub fn new<S>(config: ApiConfig, store: Arc<S>) -> Self
    where
        S: AllowlistStore + 'static,
    {
        let cache = Arc::new(TrustedIpCache::with_config(store.clone(), config.cache.clone()));
        Self::with_cache(config, store, cache)
    }

    /// Builds state around an existing cache.
    pub fn with_cache(config: ApiConfig, store: Arc<dyn AllowlistStore>, cache: Arc<TrustedIpCache>) -> Self {
        Self {
            config,
            admin: AllowlistAdmin::new(store, cache),
        }
    }

    /// Opens the configured store: Turso when a URL is set, memory otherwise.
    pub async fn connect(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        match config.database_url.clone() {
            Some(url) => {
                let store = LibsqlStore::connect_remote(url, config.database_auth_token.clone()).await?;
                Ok(Self::new(config, Arc::new(store)))
            }
            None => {
                warn!("TURSO_DATABASE_URL not set; using in-memory allowlist (entries are lost on restart)");
                info!(fallback = config.cache.fallback_ips.len(), "Fallback trusted IPs configured");
                Ok(Self::new(config, Arc::new(MemoryStore::new())))
            }
        }
    }
}
