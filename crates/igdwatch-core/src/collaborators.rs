// ── Session collaborators ──
//
// Persistence of config entries and presentation platforms are owned
// by the embedding application. The session only talks to them through
// these traits.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::config::ConfigEntry;
use crate::coordinator::RefreshCoordinator;
use crate::error::CoreError;
use crate::model::DeviceHandle;

// ── Entry persistence ────────────────────────────────────────────

/// Write access to stored config entries.
pub trait EntryStore: Send + Sync {
    fn set_unique_id(&self, entry_id: &str, unique_id: &str) -> Result<(), CoreError>;

    fn set_hostname(&self, entry_id: &str, hostname: &str) -> Result<(), CoreError>;
}

/// Writes needed to bring a stored entry in line with the discovered
/// device. Empty when the entry is already current.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub unique_id: Option<String>,
    pub hostname: Option<String>,
}

impl EntryUpdate {
    /// Adopt the device udn when the entry has no unique id, and the
    /// discovered hostname when the stored one is missing or stale.
    pub fn reconcile(entry: &ConfigEntry, device: &DeviceHandle) -> Self {
        let unique_id = entry
            .unique_id
            .is_none()
            .then(|| device.unique_id().to_owned());
        let hostname = (entry.data.hostname.as_deref() != Some(device.hostname()))
            .then(|| device.hostname().to_owned());
        Self {
            unique_id,
            hostname,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unique_id.is_none() && self.hostname.is_none()
    }

    pub fn apply(&self, store: &dyn EntryStore, entry_id: &str) -> Result<(), CoreError> {
        if let Some(unique_id) = &self.unique_id {
            store.set_unique_id(entry_id, unique_id)?;
        }
        if let Some(hostname) = &self.hostname {
            store.set_hostname(entry_id, hostname)?;
        }
        Ok(())
    }
}

/// Entry store kept in memory, for embedding without persistence.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: DashMap<String, ConfigEntry>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: ConfigEntry) {
        self.entries.insert(entry.entry_id.clone(), entry);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|e| e.value().clone())
    }

    fn update(&self, entry_id: &str, f: impl FnOnce(&mut ConfigEntry)) -> Result<(), CoreError> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| CoreError::Internal(format!("unknown config entry '{entry_id}'")))?;
        f(entry.value_mut());
        Ok(())
    }
}

impl EntryStore for MemoryEntryStore {
    fn set_unique_id(&self, entry_id: &str, unique_id: &str) -> Result<(), CoreError> {
        self.update(entry_id, |entry| entry.unique_id = Some(unique_id.to_owned()))
    }

    fn set_hostname(&self, entry_id: &str, hostname: &str) -> Result<(), CoreError> {
        self.update(entry_id, |entry| {
            entry.data.hostname = Some(hostname.to_owned());
        })
    }
}

// ── Presentation ─────────────────────────────────────────────────

/// Presentation platforms fed by a running coordinator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BinarySensor,
    Sensor,
}

/// Platforms set up for every router.
pub const PLATFORMS: [Platform; 2] = [Platform::BinarySensor, Platform::Sensor];

/// Consumer of refreshed data (sensors, dashboards).
#[async_trait]
pub trait PlatformHost: Send + Sync {
    async fn setup_platforms(
        &self,
        entry_id: &str,
        platforms: &[Platform],
        coordinator: RefreshCoordinator,
    ) -> Result<(), CoreError>;

    /// Returns `false` when nothing was loaded for the entry.
    async fn unload_platforms(&self, entry_id: &str, platforms: &[Platform])
    -> Result<bool, CoreError>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use async_trait::async_trait;
    use url::Url;

    use super::{EntryStore, EntryUpdate, MemoryEntryStore, Platform};
    use crate::config::ConfigEntry;
    use crate::device::IgdClient;
    use crate::error::CoreError;
    use crate::model::{DeviceDescription, DeviceHandle, Mapping};

    struct NullClient;

    #[async_trait]
    impl IgdClient for NullClient {
        async fn traffic_data(&self) -> Result<Mapping, CoreError> {
            Ok(Mapping::new())
        }
        async fn status(&self) -> Result<Mapping, CoreError> {
            Ok(Mapping::new())
        }
    }

    fn device() -> DeviceHandle {
        DeviceHandle::new(
            Url::parse("http://192.168.1.1:1900/desc.xml").expect("valid URL"),
            "urn:x",
            DeviceDescription {
                udn: "uuid:udn123".into(),
                ..DeviceDescription::default()
            },
            Arc::new(NullClient),
        )
        .expect("valid handle")
    }

    #[test]
    fn fresh_entry_adopts_udn_and_hostname() {
        let entry = ConfigEntry::new("router", "uuid:udn123", "urn:x");
        let update = EntryUpdate::reconcile(&entry, &device());

        assert_eq!(update.unique_id.as_deref(), Some("uuid:udn123"));
        assert_eq!(update.hostname.as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn current_entry_needs_no_writes() {
        let mut entry = ConfigEntry::new("router", "uuid:udn123", "urn:x");
        entry.unique_id = Some("uuid:udn123".into());
        entry.data.hostname = Some("192.168.1.1".into());

        assert!(EntryUpdate::reconcile(&entry, &device()).is_empty());
    }

    #[test]
    fn stale_hostname_is_rewritten_but_unique_id_kept() {
        let mut entry = ConfigEntry::new("router", "uuid:udn123", "urn:x");
        entry.unique_id = Some("legacy-id".into());
        entry.data.hostname = Some("10.0.0.1".into());

        let update = EntryUpdate::reconcile(&entry, &device());
        assert_eq!(update.unique_id, None);
        assert_eq!(update.hostname.as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn apply_writes_through_store() {
        let store = MemoryEntryStore::new();
        store.insert(ConfigEntry::new("router", "uuid:udn123", "urn:x"));
        let entry = store.get("router").expect("entry");

        EntryUpdate::reconcile(&entry, &device())
            .apply(&store, "router")
            .expect("applied");

        let stored = store.get("router").expect("entry");
        assert_eq!(stored.unique_id.as_deref(), Some("uuid:udn123"));
        assert_eq!(stored.data.hostname.as_deref(), Some("192.168.1.1"));
        assert!(store.set_hostname("missing", "x").is_err());
    }

    #[test]
    fn platform_names_are_snake_case() {
        assert_eq!(Platform::BinarySensor.to_string(), "binary_sensor");
        assert_eq!(Platform::from_str("sensor").ok(), Some(Platform::Sensor));
    }
}
