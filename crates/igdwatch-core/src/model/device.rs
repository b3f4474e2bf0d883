// ── Located router ──
//
// A `DeviceHandle` is built once per session from the discovered
// location and the description the connector fetched from it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::device::IgdClient;
use crate::error::CoreError;
use crate::model::DeviceIdentity;

/// Registry connection type for UPnP devices.
pub const CONNECTION_UPNP: &str = "upnp";
/// Identifier namespace for registry entries created by this crate.
pub const DOMAIN: &str = "igdwatch";

/// Descriptor fields read from the device description document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub udn: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
}

/// A located, described router and the client used to query it.
#[derive(Clone)]
pub struct DeviceHandle {
    identity: DeviceIdentity,
    location: Url,
    hostname: String,
    description: DeviceDescription,
    client: Arc<dyn IgdClient>,
}

impl DeviceHandle {
    /// Assemble a handle, rejecting descriptions without a udn and
    /// locations without a host.
    pub fn new(
        location: Url,
        service_type: impl Into<String>,
        description: DeviceDescription,
        client: Arc<dyn IgdClient>,
    ) -> Result<Self, CoreError> {
        if description.udn.trim().is_empty() {
            return Err(CoreError::DeviceFetch {
                location: location.to_string(),
                reason: "device description has no UDN".into(),
            });
        }
        let hostname = location
            .host_str()
            .ok_or_else(|| CoreError::DeviceFetch {
                location: location.to_string(),
                reason: "location has no host".into(),
            })?
            .to_owned();

        Ok(Self {
            identity: DeviceIdentity::new(description.udn.clone(), service_type),
            location,
            hostname,
            description,
            client,
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn udn(&self) -> &str {
        self.identity.udn()
    }

    /// Canonical unique id for the stored entry.
    pub fn unique_id(&self) -> &str {
        self.identity.udn()
    }

    pub fn service_type(&self) -> &str {
        self.identity.service_type()
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Friendly name, used as display name.
    pub fn name(&self) -> &str {
        &self.description.friendly_name
    }

    pub fn manufacturer(&self) -> &str {
        &self.description.manufacturer
    }

    pub fn model_name(&self) -> &str {
        &self.description.model_name
    }

    pub fn client(&self) -> &Arc<dyn IgdClient> {
        &self.client
    }

    /// Identity binding for presentation entities and the registry.
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::from(self)
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("identity", &self.identity)
            .field("location", &self.location.as_str())
            .field("hostname", &self.hostname)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Metadata binding entities and registry records to one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub connections: BTreeSet<(String, String)>,
    pub identifiers: BTreeSet<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl From<&DeviceHandle> for DeviceInfo {
    fn from(device: &DeviceHandle) -> Self {
        Self {
            connections: BTreeSet::from([(CONNECTION_UPNP.to_owned(), device.udn().to_owned())]),
            identifiers: BTreeSet::from([(DOMAIN.to_owned(), device.udn().to_owned())]),
            name: device.name().to_owned(),
            manufacturer: device.manufacturer().to_owned(),
            model: device.model_name().to_owned(),
        }
    }
}
