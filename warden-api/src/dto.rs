//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use warden_cache::CacheState;
use warden_core::types::AllowlistEntry;

/// Request to add (or re-describe) a trusted IP.
#[derive(Debug, Deserialize)]
pub struct CreateTrustedIpRequest {
    /// IPv4 or IPv6 address
    pub ip: String,
    /// Optional note
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to edit a trusted IP's description.
#[derive(Debug, Deserialize)]
pub struct UpdateTrustedIpRequest {
    /// New description; null or blank clears it
    #[serde(default)]
    pub description: Option<String>,
}

/// A trusted IP entry.
#[derive(Debug, Serialize)]
pub struct TrustedIpDto {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl From<AllowlistEntry> for TrustedIpDto {
    fn from(entry: AllowlistEntry) -> Self {
        Self {
            ip: entry.ip,
            description: entry.description,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Response for listing trusted IPs.
#[derive(Debug, Serialize)]
pub struct ListTrustedIpsResponse {
    pub items: Vec<TrustedIpDto>,
    pub total: u64,
}

/// Response for deletion.
#[derive(Debug, Serialize)]
pub struct DeleteTrustedIpResponse {
    pub ip: String,
    pub deleted: bool,
}

/// Response for a manual invalidation.
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
    pub state: CacheState,
}

/// Acknowledgement returned to accepted webhook calls.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub accepted: bool,
    pub source: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache_state: CacheState,
    pub trusted_ips: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dto_from_entry() {
        let entry = AllowlistEntry::new("1.2.3.4", Some("gateway".into())).unwrap();
        let dto = TrustedIpDto::from(entry);
        assert_eq!(dto.ip, "1.2.3.4");
        assert!(dto.created_at.contains('T'));

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["description"], "gateway");
    }

    #[test]
    fn test_create_request_description_optional() {
        let req: CreateTrustedIpRequest = serde_json::from_str(r#"{"ip":"1.2.3.4"}"#).unwrap();
        assert_eq!(req.ip, "1.2.3.4");
        assert!(req.description.is_none());
    }
}
