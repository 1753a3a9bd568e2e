//! # WARDEN Core
//!
//! Core types, errors, and traits for the WARDEN trusted-IP gate.
//!
//! This crate provides the foundational building blocks used by all other WARDEN crates:
//!
//! - **Types**: Allowlist entries, IP normalization, and the cached trusted-IP snapshot
//! - **Errors**: A single error enum with classification helpers
//! - **Constants**: Cache defaults and the built-in fallback allowlist
//! - **Traits**: Storage and clock seams used by the cache and the API
//!
//! ## Example
//!
//! ```rust
//! use warden_core::{normalize_ip, TrustedIpSet};
//!
//! let ip = normalize_ip(" 10.0.0.1 ").unwrap();
//! let set = TrustedIpSet::from_iter([ip]);
//! assert!(set.contains("10.0.0.1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, WardenError};
pub use traits::*;
pub use types::*;
