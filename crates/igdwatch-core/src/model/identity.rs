// ── Device identity ──
//
// USN-based router identity and the discovery announcements matched
// against it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

const USN_SEPARATOR: &str = "::";

/// Composite `(udn, service_type)` identity of a router.
///
/// The joined form `"{udn}::{st}"` is the SSDP unique service name (USN)
/// and doubles as the discovery subscription filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    udn: String,
    service_type: String,
}

impl DeviceIdentity {
    pub fn new(udn: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            udn: udn.into(),
            service_type: service_type.into(),
        }
    }

    /// Split a USN back into its udn and service type.
    ///
    /// Returns `None` when either half is missing or empty.
    pub fn parse_usn(usn: &str) -> Option<Self> {
        let (udn, st) = usn.trim().split_once(USN_SEPARATOR)?;
        if udn.is_empty() || st.is_empty() {
            return None;
        }
        Some(Self::new(udn, st))
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// The opaque identity token used as discovery filter.
    pub fn usn(&self) -> String {
        format!("{}{USN_SEPARATOR}{}", self.udn, self.service_type)
    }

    /// Exact field match against an announced USN.
    pub fn matches(&self, usn: &str) -> bool {
        usn.split_once(USN_SEPARATOR)
            .is_some_and(|(udn, st)| udn == self.udn && st == self.service_type)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{USN_SEPARATOR}{}", self.udn, self.service_type)
    }
}

/// A "device seen at location" announcement from the discovery transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub usn: String,
    /// Device description URL (SSDP `LOCATION`).
    pub location: Url,
    /// Remaining announcement headers (`SERVER`, `CACHE-CONTROL`, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DiscoveryEvent {
    pub fn new(usn: impl Into<String>, location: Url) -> Self {
        Self {
            usn: usn.into(),
            location,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceIdentity;

    const UDN: &str = "uuid:udn123";
    const ST: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

    #[test]
    fn usn_joins_udn_and_service_type() {
        let identity = DeviceIdentity::new(UDN, ST);
        assert_eq!(
            identity.usn(),
            "uuid:udn123::urn:schemas-upnp-org:service:WANIPConnection:1"
        );
        assert_eq!(identity.to_string(), identity.usn());
    }

    #[test]
    fn parse_usn_splits_on_first_separator() {
        let identity = DeviceIdentity::parse_usn(&format!("{UDN}::{ST}")).expect("valid USN");
        assert_eq!(identity.udn(), UDN);
        assert_eq!(identity.service_type(), ST);
    }

    #[test]
    fn parse_usn_rejects_incomplete_tokens() {
        assert!(DeviceIdentity::parse_usn("uuid:udn123").is_none());
        assert!(DeviceIdentity::parse_usn("::urn:x").is_none());
        assert!(DeviceIdentity::parse_usn("uuid:udn123::").is_none());
    }

    #[test]
    fn matches_requires_both_fields() {
        let identity = DeviceIdentity::new(UDN, ST);
        assert!(identity.matches(&format!("{UDN}::{ST}")));
        assert!(!identity.matches(&format!("{UDN}::urn:other")));
        assert!(!identity.matches(&format!("uuid:udn1234::{ST}")));
        assert!(!identity.matches(UDN));
    }
}
