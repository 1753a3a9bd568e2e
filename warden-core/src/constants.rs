//! Defaults for the trusted-IP cache and allowlist store.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live of a trusted-IP snapshot, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default upper bound for a single reload query, in milliseconds.
/// A hung storage connection must not stall every waiting webhook request.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;

/// Addresses installed when storage is unreachable and nothing was ever loaded.
pub const DEFAULT_FALLBACK_IPS: &[&str] = &["100.64.0.9", "103.123.45.68"];

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum accepted length of an entry description.
pub const MAX_DESCRIPTION_LEN: usize = 255;
