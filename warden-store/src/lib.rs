//! # WARDEN Store
//!
//! Persistent storage for the trusted-IP allowlist.
//!
//! This crate provides two storage backends:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **libSQL** (feature `turso`): Turso / SQLite-compatible storage for production
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_store::{MemoryStore, AllowlistStore};
//! use warden_core::AllowlistEntry;
//!
//! let store = MemoryStore::new();
//! store.upsert_entry(AllowlistEntry::new("1.2.3.4", None)?).await?;
//!
//! let ips = store.fetch_trusted_ips().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;
#[cfg(feature = "turso")]
mod turso;

pub use memory::MemoryStore;
#[cfg(feature = "turso")]
pub use turso::LibsqlStore;

// Re-export the traits from core
pub use warden_core::traits::{AllowlistStore, TrustedIpSource};
