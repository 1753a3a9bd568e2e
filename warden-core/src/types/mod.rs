//! Domain types for WARDEN.
//!
//! - [`AllowlistEntry`]: Persisted trusted-IP row
//! - [`TrustedIpSet`]: Immutable snapshot served by the cache

mod entry;
mod ip_set;

pub use entry::*;
pub use ip_set::*;
