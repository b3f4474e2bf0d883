// ── Runtime session configuration ──
//
// These types describe *which* router a session targets and how often
// to poll it. They never touch disk; `igdwatch-config` builds them from
// TOML and hands them in.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::DeviceIdentity;

/// Default refresh period when an entry has no override.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
/// Default discovery wait budget.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Integration-wide settings shared by every session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Source address override for talking to routers.
    pub local_ip: Option<IpAddr>,
    pub discovery_timeout: Option<Duration>,
    pub default_scan_interval: Option<Duration>,
}

impl GlobalConfig {
    /// Parse and validate a textual `local_ip` override.
    pub fn parse_local_ip(raw: &str) -> Result<IpAddr, CoreError> {
        raw.trim()
            .parse()
            .map_err(|_| CoreError::ConfigValidation {
                field: "local_ip".into(),
                reason: format!("'{raw}' is not a valid IP address"),
            })
    }
}

/// Persisted identity of a configured router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub udn: String,
    /// Service type the router was discovered with.
    pub st: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// User-adjustable options of a configured router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Refresh period in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,
}

/// One configured router, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    pub data: EntryData,
    #[serde(default)]
    pub options: EntryOptions,
}

impl ConfigEntry {
    pub fn new(entry_id: impl Into<String>, udn: impl Into<String>, st: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            unique_id: None,
            data: EntryData {
                udn: udn.into(),
                st: st.into(),
                hostname: None,
            },
            options: EntryOptions::default(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.data.udn.clone(), self.data.st.clone())
    }

    /// Reject entries that could never be discovered.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.entry_id.trim().is_empty() {
            return Err(validation("entry_id", "must not be empty"));
        }
        if self.data.udn.trim().is_empty() {
            return Err(validation("udn", "must not be empty"));
        }
        if self.data.st.trim().is_empty() {
            return Err(validation("st", "must not be empty"));
        }
        if self.options.scan_interval == Some(0) {
            return Err(validation("scan_interval", "must be at least 1 second"));
        }
        Ok(())
    }
}

fn validation(field: &str, reason: &str) -> CoreError {
    CoreError::ConfigValidation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Per-session tuning, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub discovery_timeout: Duration,
    pub scan_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Resolve tuning for one entry: entry option, then global default,
    /// then the built-in default.
    pub fn for_entry(entry: &ConfigEntry, global: &GlobalConfig) -> Self {
        let scan_interval = entry
            .options
            .scan_interval
            .map(Duration::from_secs)
            .or(global.default_scan_interval)
            .unwrap_or(DEFAULT_SCAN_INTERVAL);
        Self {
            discovery_timeout: global.discovery_timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT),
            scan_interval,
        }
    }
}
