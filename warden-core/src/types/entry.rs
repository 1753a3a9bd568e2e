//! Persisted allowlist entries and input normalization.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_DESCRIPTION_LEN;
use crate::error::{Result, WardenError};

/// One row of the `trusted_ips` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    /// Canonical textual IP address (primary key)
    pub ip: String,
    /// Free-form note shown in the admin panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the entry was first created
    pub created_at: DateTime<Utc>,
}

impl AllowlistEntry {
    /// Creates a new entry stamped with the current time.
    ///
    /// The address is normalized and the description validated.
    pub fn new(ip: &str, description: Option<String>) -> Result<Self> {
        Ok(Self {
            ip: normalize_ip(ip)?,
            description: normalize_description(description)?,
            created_at: Utc::now(),
        })
    }
}

/// Parses and re-renders an IP address in canonical form.
///
/// Surrounding whitespace is ignored and IPv4-mapped IPv6 addresses collapse
/// to IPv4, so that cache lookups can compare strings exactly.
pub fn normalize_ip(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let addr: IpAddr = trimmed
        .parse()
        .map_err(|_| WardenError::InvalidIp(trimmed.to_string()))?;
    Ok(canonical_ip(addr).to_string())
}

/// Collapses IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to IPv4.
pub fn canonical_ip(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Trims a description, mapping blank input to `None`.
pub fn normalize_description(description: Option<String>) -> Result<Option<String>> {
    let Some(text) = description else {
        return Ok(None);
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let len = trimmed.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(WardenError::DescriptionTooLong {
            max: MAX_DESCRIPTION_LEN,
            actual: len,
        });
    }

    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1.2.3.4", "1.2.3.4" ; "plain ipv4")]
    #[test_case("  10.0.0.1\n", "10.0.0.1" ; "surrounding whitespace")]
    #[test_case("2001:DB8::1", "2001:db8::1" ; "ipv6 lowercased")]
    #[test_case("2001:0db8:0000:0000:0000:0000:0000:0001", "2001:db8::1" ; "ipv6 compressed")]
    #[test_case("::ffff:192.168.1.7", "192.168.1.7" ; "ipv4 mapped")]
    fn test_normalize_ip(input: &str, expected: &str) {
        assert_eq!(normalize_ip(input).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("localhost" ; "hostname")]
    #[test_case("256.1.1.1" ; "octet overflow")]
    #[test_case("10.0.0.0/8" ; "cidr")]
    fn test_normalize_ip_rejects(input: &str) {
        let err = normalize_ip(input).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_description_blank_is_none() {
        assert_eq!(normalize_description(Some("   ".into())).unwrap(), None);
        assert_eq!(normalize_description(None).unwrap(), None);
        assert_eq!(
            normalize_description(Some(" payment gateway ".into())).unwrap(),
            Some("payment gateway".into())
        );
    }

    #[test]
    fn test_description_too_long() {
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = normalize_description(Some(long)).unwrap_err();
        assert!(matches!(err, WardenError::DescriptionTooLong { .. }));
    }

    #[test]
    fn test_entry_serialization() {
        let entry = AllowlistEntry::new("1.2.3.4", None).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ip"], "1.2.3.4");
        assert!(json.get("description").is_none());
    }
}
