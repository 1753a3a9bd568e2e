//! Error types for WARDEN.
//!
//! One error enum covers validation, storage, and configuration failures.
//! The trusted-IP cache never returns these to its callers; they surface on
//! the admin write path and in logs.

use thiserror::Error;

/// Result type alias using `WardenError`.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Main error type for all WARDEN operations.
#[derive(Debug, Error)]
pub enum WardenError {
    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input is not a valid IPv4 or IPv6 address.
    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    /// Description exceeds the allowed length.
    #[error("Description too long: max {max} characters, got {actual}")]
    DescriptionTooLong {
        /// Maximum accepted length in characters
        max: usize,
        /// Length of the rejected description
        actual: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // ALLOWLIST ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No allowlist entry exists for the address.
    #[error("Trusted IP not found: {0}")]
    EntryNotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Storage backend rejected or failed the operation.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Storage query did not complete in time.
    #[error("Storage timeout after {millis}ms")]
    StorageTimeout {
        /// Timeout that elapsed
        millis: u64,
    },

    /// A stored row could not be decoded.
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration value the server cannot run with.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WardenError {
    /// Returns true if this error is transient (the next attempt may succeed).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WardenError::StorageError(_)
                | WardenError::StorageTimeout { .. }
                | WardenError::MalformedRow(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            WardenError::InvalidIp(_) | WardenError::DescriptionTooLong { .. }
        )
    }

    /// Returns true if the referenced entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::EntryNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WardenError::DescriptionTooLong { max: 255, actual: 300 };
        assert!(err.to_string().contains("255"));
        assert!(err.to_string().contains("300"));

        let err = WardenError::StorageTimeout { millis: 5000 };
        assert_eq!(err.to_string(), "Storage timeout after 5000ms");
    }

    #[test]
    fn test_error_classification() {
        assert!(WardenError::StorageError("refused".into()).is_recoverable());
        assert!(WardenError::StorageTimeout { millis: 1 }.is_recoverable());
        assert!(!WardenError::InvalidIp("x".into()).is_recoverable());

        assert!(WardenError::InvalidIp("x".into()).is_validation_error());
        assert!(!WardenError::EntryNotFound("1.2.3.4".into()).is_validation_error());

        assert!(WardenError::EntryNotFound("1.2.3.4".into()).is_not_found());
        assert!(!WardenError::StorageError("x".into()).is_not_found());
    }

    #[test]
    fn test_config_error_is_not_recoverable() {
        let err = WardenError::ConfigError("TRUSTED_PROXY_HOPS must be at least 1".into());
        assert!(!err.is_recoverable());
        assert!(!err.is_validation_error());
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
