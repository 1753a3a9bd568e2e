//! In-memory allowlist store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments without a database.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use warden_core::error::{Result, WardenError};
use warden_core::traits::{AllowlistStore, TrustedIpSource};
use warden_core::types::{normalize_description, normalize_ip, AllowlistEntry};

/// In-memory allowlist store.
///
/// Entries are keyed by canonical IP. Reads can be switched to fail with a
/// storage error to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, AllowlistEntry>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with addresses (no descriptions).
    pub fn with_ips<I, S>(ips: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store = Self::new();
        for ip in ips {
            let entry = AllowlistEntry::new(ip.as_ref(), None)?;
            store.entries.insert(entry.ip.clone(), entry);
        }
        Ok(store)
    }

    /// Makes every subsequent read fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WardenError::StorageError("memory store reads disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrustedIpSource for MemoryStore {
    async fn fetch_trusted_ips(&self) -> Result<Vec<String>> {
        self.check_reads()?;
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

#[async_trait]
impl AllowlistStore for MemoryStore {
    async fn list_entries(&self) -> Result<Vec<AllowlistEntry>> {
        self.check_reads()?;
        let mut entries: Vec<AllowlistEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.ip.cmp(&b.ip)));
        Ok(entries)
    }

    async fn get_entry(&self, ip: &str) -> Result<Option<AllowlistEntry>> {
        self.check_reads()?;
        let ip = normalize_ip(ip)?;
        Ok(self.entries.get(&ip).map(|e| e.value().clone()))
    }

    #[instrument(skip(self, entry), fields(ip = %entry.ip))]
    async fn upsert_entry(&self, entry: AllowlistEntry) -> Result<AllowlistEntry> {
        let ip = normalize_ip(&entry.ip)?;
        let description = normalize_description(entry.description)?;

        let stored = self
            .entries
            .entry(ip.clone())
            .and_modify(|existing| existing.description = description.clone())
            .or_insert_with(|| AllowlistEntry {
                ip,
                description,
                created_at: entry.created_at,
            })
            .value()
            .clone();

        debug!("Upserted trusted IP");
        Ok(stored)
    }

    #[instrument(skip(self, description))]
    async fn update_description(&self, ip: &str, description: Option<String>) -> Result<AllowlistEntry> {
        let ip = normalize_ip(ip)?;
        let description = normalize_description(description)?;

        let mut entry = self
            .entries
            .get_mut(&ip)
            .ok_or_else(|| WardenError::EntryNotFound(ip.clone()))?;
        entry.description = description;
        Ok(entry.value().clone())
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, ip: &str) -> Result<bool> {
        let ip = normalize_ip(ip)?;
        Ok(self.entries.remove(&ip).is_some())
    }
}
