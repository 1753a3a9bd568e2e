//! Common traits for WARDEN.
//!
//! These traits define the seams between the cache, the storage backends,
//! and the API layer, enabling substitution of fakes in tests.

use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::AllowlistEntry;

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Read side of the allowlist, the only shape the cache depends on.
#[async_trait]
pub trait TrustedIpSource: Send + Sync {
    /// Returns every allowlisted address.
    ///
    /// Order is irrelevant and duplicates are tolerated.
    async fn fetch_trusted_ips(&self) -> Result<Vec<String>>;
}

/// Full allowlist storage used by the admin write path.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - libSQL / Turso (for production)
///
/// Callers that mutate the allowlist must invalidate any cache built on top
/// of the same store once the write returns.
#[async_trait]
pub trait AllowlistStore: TrustedIpSource {
    /// Lists all entries, newest first.
    async fn list_entries(&self) -> Result<Vec<AllowlistEntry>>;

    /// Fetches a single entry by canonical address.
    async fn get_entry(&self, ip: &str) -> Result<Option<AllowlistEntry>>;

    /// Inserts an entry, or replaces the description if the address exists.
    ///
    /// Returns the stored row.
    async fn upsert_entry(&self, entry: AllowlistEntry) -> Result<AllowlistEntry>;

    /// Replaces the description of an existing entry.
    ///
    /// Fails with `EntryNotFound` when the address is absent.
    async fn update_description(&self, ip: &str, description: Option<String>) -> Result<AllowlistEntry>;

    /// Deletes an entry. Returns false if nothing was removed.
    async fn delete_entry(&self, ip: &str) -> Result<bool>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
