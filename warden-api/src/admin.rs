//! Allowlist write path.
//!
//! Every mutation goes through [`AllowlistAdmin`], which invalidates the
//! trusted-IP cache once the store has committed the write. Without that
//! call a revoked address stays trusted for up to one TTL.

use std::sync::Arc;

use tracing::info;

use warden_cache::TrustedIpCache;
use warden_core::error::{Result, WardenError};
use warden_core::traits::AllowlistStore;
use warden_core::types::{normalize_ip, AllowlistEntry, TrustedIpSet};

/// Allowlist CRUD bound to the cache that serves webhook ingress.
pub struct AllowlistAdmin {
    store: Arc<dyn AllowlistStore>,
    cache: Arc<TrustedIpCache>,
}

impl AllowlistAdmin {
    /// Creates the write path over `store`, invalidating `cache`.
    pub fn new(store: Arc<dyn AllowlistStore>, cache: Arc<TrustedIpCache>) -> Self {
        Self { store, cache }
    }

    /// The cache consulted by ingress.
    pub fn cache(&self) -> &Arc<TrustedIpCache> {
        &self.cache
    }

    /// Lists entries, newest first.
    pub async fn list(&self) -> Result<Vec<AllowlistEntry>> {
        self.store.list_entries().await
    }

    /// Fetches one entry, failing with `EntryNotFound` when absent.
    pub async fn get(&self, ip: &str) -> Result<AllowlistEntry> {
        let ip = normalize_ip(ip)?;
        self.store
            .get_entry(&ip)
            .await?
            .ok_or(WardenError::EntryNotFound(ip))
    }

    /// Adds an address, or replaces its description if already present.
    pub async fn create(&self, ip: &str, description: Option<String>) -> Result<AllowlistEntry> {
        let entry = AllowlistEntry::new(ip, description)?;
        let stored = self.store.upsert_entry(entry).await?;
        self.cache.invalidate();
        info!(ip = %stored.ip, "Trusted IP saved");
        Ok(stored)
    }

    /// Replaces the description of an existing address.
    pub async fn update(&self, ip: &str, description: Option<String>) -> Result<AllowlistEntry> {
        let stored = self.store.update_description(ip, description).await?;
        self.cache.invalidate();
        info!(ip = %stored.ip, "Trusted IP updated");
        Ok(stored)
    }

    /// Removes an address, failing with `EntryNotFound` when absent.
    pub async fn delete(&self, ip: &str) -> Result<String> {
        let ip = normalize_ip(ip)?;
        if !self.store.delete_entry(&ip).await? {
            return Err(WardenError::EntryNotFound(ip));
        }
        self.cache.invalidate();
        info!(ip = %ip, "Trusted IP deleted");
        Ok(ip)
    }

    /// Current trusted set, as seen by ingress.
    pub async fn trusted_ips(&self) -> TrustedIpSet {
        self.cache.get_trusted_ips().await
    }
}
