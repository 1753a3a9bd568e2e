//! Trusted-IP cache for webhook ingress.
//!
//! Serves a snapshot of the allowlist from memory, reloading from storage at
//! most once per TTL window or on demand after [`TrustedIpCache::invalidate`].

mod cache;
mod clock;

pub use cache::{CacheConfig, CacheState, CacheStats, TrustedIpCache};
pub use clock::ManualClock;
