//! Single-flight TTL cache of trusted IP addresses.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use warden_core::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_FALLBACK_IPS, DEFAULT_QUERY_TIMEOUT_MS};
use warden_core::error::{Result, WardenError};
use warden_core::traits::{Clock, SystemClock, TrustedIpSource};
use warden_core::types::{normalize_ip, TrustedIpSet};

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshot time-to-live in seconds
    pub ttl_seconds: u64,
    /// Upper bound for one reload query, in milliseconds
    pub query_timeout_ms: u64,
    /// Addresses served when storage is down and nothing was ever loaded
    pub fallback_ips: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            fallback_ips: DEFAULT_FALLBACK_IPS.iter().map(|ip| ip.to_string()).collect(),
        }
    }
}

impl CacheConfig {
    /// Snapshot TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Reload query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Lifecycle state of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing loaded and no reload attempted yet.
    Cold,
    /// Serving a snapshot younger than the TTL.
    Fresh,
    /// TTL elapsed or invalidated; the next read reloads.
    Stale,
    /// The last reload failed; serving the previous or fallback snapshot.
    Degraded,
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    pub state: CacheState,
    pub entries: usize,
    pub ttl_seconds: u64,
    /// Seconds since the last successful reload, if it is still authoritative
    pub age_seconds: Option<u64>,
    pub storage_queries: u64,
    pub reload_failures: u64,
    pub invalidations: u64,
    /// Stored rows dropped because they are not IP addresses
    pub skipped_rows: u64,
}

struct Snapshot {
    members: TrustedIpSet,
    /// `None` forces the next read to reload.
    loaded_at: Option<Instant>,
    /// Bumped by every invalidation.
    generation: u64,
    ever_loaded: bool,
    last_attempt_failed: bool,
}

/// Trusted-IP snapshot with lazy refresh and manual invalidation.
///
/// Reads within the TTL are served from memory. A stale read takes the
/// single-flight lock, re-checks, and queries storage once for every caller
/// waiting behind it. Storage failures never reach the caller: the previous
/// snapshot (or the fallback list on a cold start) keeps being served and the
/// next read retries.
pub struct TrustedIpCache {
    source: Arc<dyn TrustedIpSource>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    fallback: TrustedIpSet,
    snapshot: RwLock<Snapshot>,
    reload_lock: Mutex<()>,
    completed_attempts: AtomicU64,
    storage_queries: AtomicU64,
    reload_failures: AtomicU64,
    invalidations: AtomicU64,
    skipped_rows: AtomicU64,
}

impl TrustedIpCache {
    /// Creates a cache with default configuration.
    pub fn new(source: Arc<dyn TrustedIpSource>) -> Self {
        Self::with_config(source, CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(source: Arc<dyn TrustedIpSource>, config: CacheConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Creates a cache with custom configuration and time source.
    pub fn with_clock(source: Arc<dyn TrustedIpSource>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let (fallback, _) = canonical_set(&config.fallback_ips, "fallback");
        if fallback.is_empty() {
            warn!("Trusted IP fallback list is empty; a storage outage at startup will reject all webhook callers");
        }

        Self {
            source,
            clock,
            config,
            fallback,
            snapshot: RwLock::new(Snapshot {
                members: TrustedIpSet::new(),
                loaded_at: None,
                generation: 0,
                ever_loaded: false,
                last_attempt_failed: false,
            }),
            reload_lock: Mutex::new(()),
            completed_attempts: AtomicU64::new(0),
            storage_queries: AtomicU64::new(0),
            reload_failures: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            skipped_rows: AtomicU64::new(0),
        }
    }

    /// Returns the current set of trusted IPs.
    ///
    /// Never fails. An empty result means nothing could be loaded and the
    /// fallback list is empty; callers should reject everyone.
    pub async fn get_trusted_ips(&self) -> TrustedIpSet {
        if let Some(set) = self.fresh_snapshot() {
            return set;
        }

        let seen_attempts = self.completed_attempts.load(Ordering::Acquire);
        let _guard = self.reload_lock.lock().await;

        if let Some(set) = self.fresh_snapshot() {
            debug!("Trusted IPs refreshed by a concurrent caller");
            return set;
        }

        {
            let snap = self.snapshot.read();
            if snap.last_attempt_failed && self.completed_attempts.load(Ordering::Acquire) != seen_attempts {
                debug!("Sharing outcome of the failed reload we waited on");
                return snap.members.clone();
            }
        }

        self.reload().await
    }

    /// Returns true if `addr` is in the current trusted set.
    pub async fn is_trusted(&self, addr: IpAddr) -> bool {
        self.get_trusted_ips().await.contains_addr(addr)
    }

    /// Forces the next read to reload from storage.
    ///
    /// The current members stay in place so a failing reload can still
    /// serve them. Must be called after every committed allowlist write.
    pub fn invalidate(&self) {
        let mut snap = self.snapshot.write();
        snap.loaded_at = None;
        snap.generation = snap.generation.wrapping_add(1);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(generation = snap.generation, "Trusted IP cache invalidated");
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> CacheState {
        let snap = self.snapshot.read();
        self.state_of(&snap)
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let snap = self.snapshot.read();
        let now = self.clock.now();
        CacheStats {
            state: self.state_of(&snap),
            entries: snap.members.len(),
            ttl_seconds: self.config.ttl_seconds,
            age_seconds: snap
                .loaded_at
                .map(|at| now.saturating_duration_since(at).as_secs()),
            storage_queries: self.storage_queries.load(Ordering::Relaxed),
            reload_failures: self.reload_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            skipped_rows: self.skipped_rows.load(Ordering::Relaxed),
        }
    }

    fn state_of(&self, snap: &Snapshot) -> CacheState {
        if snap.last_attempt_failed {
            CacheState::Degraded
        } else if !snap.ever_loaded {
            CacheState::Cold
        } else if self.is_fresh(snap) {
            CacheState::Fresh
        } else {
            CacheState::Stale
        }
    }

    fn is_fresh(&self, snap: &Snapshot) -> bool {
        match snap.loaded_at {
            Some(at) => {
                !snap.members.is_empty()
                    && self.clock.now().saturating_duration_since(at) < self.config.ttl()
            }
            None => false,
        }
    }

    fn fresh_snapshot(&self) -> Option<TrustedIpSet> {
        let snap = self.snapshot.read();
        self.is_fresh(&snap).then(|| snap.members.clone())
    }

    /// Queries storage and swaps in the result. Caller holds `reload_lock`.
    async fn reload(&self) -> TrustedIpSet {
        let generation = self.snapshot.read().generation;
        self.storage_queries.fetch_add(1, Ordering::Relaxed);

        let result = match tokio::time::timeout(self.config.query_timeout(), self.source.fetch_trusted_ips()).await {
            Ok(result) => result.and_then(|rows| self.parse_rows(rows)),
            Err(_) => Err(WardenError::StorageTimeout {
                millis: self.config.query_timeout_ms,
            }),
        };

        let set = match result {
            Ok(members) => {
                let now = self.clock.now();
                let mut snap = self.snapshot.write();
                snap.members = members.clone();
                snap.ever_loaded = true;
                snap.last_attempt_failed = false;
                if snap.generation == generation {
                    snap.loaded_at = Some(now);
                } else {
                    debug!("Invalidated while reloading; next read reloads again");
                }
                drop(snap);

                info!(count = members.len(), "Trusted IPs refreshed");
                members
            }
            Err(err) => self.fail_reload(err),
        };

        self.completed_attempts.fetch_add(1, Ordering::Release);
        set
    }

    /// Canonicalises stored rows. Rows that are not addresses are skipped;
    /// a non-empty result with no usable row is a malformed result.
    fn parse_rows(&self, rows: Vec<String>) -> Result<TrustedIpSet> {
        let total = rows.len();
        let (members, skipped) = canonical_set(&rows, "stored");
        if skipped > 0 {
            self.skipped_rows.fetch_add(skipped as u64, Ordering::Relaxed);
        }
        if total > 0 && members.is_empty() {
            return Err(WardenError::MalformedRow(format!(
                "none of {} stored trusted IP rows is a valid address",
                total
            )));
        }
        Ok(members)
    }

    fn fail_reload(&self, err: WardenError) -> TrustedIpSet {
        self.reload_failures.fetch_add(1, Ordering::Relaxed);
        error!(error = %err, "Failed to load trusted IPs from storage");

        let mut snap = self.snapshot.write();
        snap.last_attempt_failed = true;

        if !snap.members.is_empty() {
            return snap.members.clone();
        }

        if self.fallback.is_empty() {
            drop(snap);
            error!("No trusted IPs available: storage unreachable, nothing cached, fallback list empty");
            return TrustedIpSet::new();
        }

        snap.members = self.fallback.clone();
        drop(snap);
        warn!(count = self.fallback.len(), "Using fallback trusted IPs (degraded mode)");
        self.fallback.clone()
    }
}

/// Builds a set of canonical addresses, returning it with the number of
/// entries dropped as invalid.
fn canonical_set(raw: &[String], origin: &'static str) -> (TrustedIpSet, usize) {
    let mut skipped = 0;
    let set = raw
        .iter()
        .filter_map(|ip| match normalize_ip(ip) {
            Ok(ip) => Some(ip),
            Err(err) => {
                warn!(origin, error = %err, "Ignoring invalid trusted IP");
                skipped += 1;
                None
            }
        })
        .collect();
    (set, skipped)
}
