//! Immutable snapshot of trusted addresses.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::entry::canonical_ip;

/// A point-in-time set of trusted IP addresses.
///
/// Cloning shares the underlying set; a snapshot is never mutated after it
/// is built, so readers can hold one across await points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrustedIpSet {
    members: Arc<HashSet<String>>,
}

impl TrustedIpSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `ip` (textual, canonical form) is a member.
    pub fn contains(&self, ip: &str) -> bool {
        self.members.contains(ip)
    }

    /// Returns true if the socket-level address is a member.
    pub fn contains_addr(&self, addr: IpAddr) -> bool {
        self.members.contains(&canonical_ip(addr).to_string())
    }

    /// Number of addresses in the snapshot.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the snapshot holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the addresses sorted, for stable display.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut ips: Vec<String> = self.members.iter().cloned().collect();
        ips.sort();
        ips
    }

    /// Returns true if both values share the same underlying allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }
}

impl<S: Into<String>> FromIterator<S> for TrustedIpSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            members: Arc::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}

impl Serialize for TrustedIpSet {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        self.to_sorted_vec().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_contains() {
        let set = TrustedIpSet::from_iter(["1.2.3.4", "2001:db8::1"]);
        assert!(set.contains("1.2.3.4"));
        assert!(!set.contains("5.6.7.8"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_contains_addr_canonicalizes_mapped() {
        let set = TrustedIpSet::from_iter(["192.168.1.7"]);
        let mapped = IpAddr::V6(Ipv4Addr::new(192, 168, 1, 7).to_ipv6_mapped());
        assert!(set.contains_addr(mapped));
        assert!(set.contains_addr(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7))));
        assert!(!set.contains_addr(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn test_clone_shares_snapshot() {
        let set = TrustedIpSet::from_iter(["1.2.3.4"]);
        let other = set.clone();
        assert!(set.ptr_eq(&other));
        assert!(!set.ptr_eq(&TrustedIpSet::from_iter(["1.2.3.4"])));
    }

    #[test]
    fn test_serializes_sorted() {
        let set = TrustedIpSet::from_iter(["5.6.7.8", "1.2.3.4"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["1.2.3.4","5.6.7.8"]"#);
    }

    proptest! {
        #[test]
        fn prop_members_are_deduplicated(octets in proptest::collection::vec(any::<[u8; 4]>(), 0..64)) {
            let ips: Vec<String> = octets.iter().map(|o| Ipv4Addr::from(*o).to_string()).collect();
            let set = TrustedIpSet::from_iter(ips.clone());
            let unique: HashSet<&String> = ips.iter().collect();
            prop_assert_eq!(set.len(), unique.len());
            for ip in &ips {
                prop_assert!(set.contains(ip));
            }
        }
    }
}
