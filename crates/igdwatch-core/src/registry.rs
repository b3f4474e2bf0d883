// ── Device registry ──
//
// Get-or-create bookkeeping of routers, keyed by their identifiers.
// Upserting the same router again updates its metadata in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::CoreError;
use crate::model::DeviceInfo;

/// A device known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDevice {
    /// Registry key (first identifier value).
    pub id: String,
    pub config_entries: BTreeSet<String>,
    pub info: DeviceInfo,
}

pub trait DeviceRegistry: Send + Sync {
    fn get_or_create(
        &self,
        entry_id: &str,
        info: &DeviceInfo,
    ) -> Result<Arc<RegisteredDevice>, CoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    devices: DashMap<String, Arc<RegisteredDevice>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredDevice>> {
        self.devices.get(id).map(|d| Arc::clone(d.value()))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceRegistry for InMemoryRegistry {
    fn get_or_create(
        &self,
        entry_id: &str,
        info: &DeviceInfo,
    ) -> Result<Arc<RegisteredDevice>, CoreError> {
        let id = info
            .identifiers
            .iter()
            .next()
            .map(|(_, value)| value.clone())
            .ok_or_else(|| CoreError::Registry {
                message: format!("device '{}' has no identifiers", info.name),
            })?;

        let mut slot = self.devices.entry(id.clone()).or_insert_with(|| {
            debug!(id = %id, "registering device");
            Arc::new(RegisteredDevice {
                id: id.clone(),
                config_entries: BTreeSet::new(),
                info: info.clone(),
            })
        });

        let mut device = RegisteredDevice::clone(slot.value());
        device.config_entries.insert(entry_id.to_owned());
        device.info.connections.extend(info.connections.iter().cloned());
        device.info.identifiers.extend(info.identifiers.iter().cloned());
        device.info.name.clone_from(&info.name);
        device.info.manufacturer.clone_from(&info.manufacturer);
        device.info.model.clone_from(&info.model);

        let device = Arc::new(device);
        *slot.value_mut() = Arc::clone(&device);
        Ok(device)
    }
}
