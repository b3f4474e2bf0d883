//! Shared configuration for igdwatch.
//!
//! TOML file + environment loading, boundary validation, and translation
//! to `igdwatch_core` session types. Also provides [`FileEntryStore`],
//! which persists the unique-id and hostname reconciliation a session
//! performs back into the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use igdwatch_core::{ConfigEntry, CoreError, EntryData, EntryOptions, EntryStore, GlobalConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no config entry named '{entry_id}'")]
    UnknownEntry { entry_id: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::ConfigValidation { field, reason },
            other => Self::Internal(other.to_string()),
        }
    }
}

fn validation(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Source address override (must parse as an IP address).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ip: Option<String>,

    /// Discovery wait budget, seconds.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout: u64,

    /// Refresh period for entries without their own, seconds.
    #[serde(default = "default_scan_interval")]
    pub default_scan_interval: u64,

    /// Configured routers.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_ip: None,
            discovery_timeout: default_discovery_timeout(),
            default_scan_interval: default_scan_interval(),
            entries: Vec::new(),
        }
    }
}

fn default_discovery_timeout() -> u64 {
    10
}
fn default_scan_interval() -> u64 {
    30
}

/// A configured router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    pub entry_id: String,
    pub udn: String,
    /// Service type the router was discovered with.
    pub st: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Refresh period override, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval: Option<u64>,
}

impl From<&Entry> for ConfigEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            entry_id: entry.entry_id.clone(),
            unique_id: entry.unique_id.clone(),
            data: EntryData {
                udn: entry.udn.clone(),
                st: entry.st.clone(),
                hostname: entry.hostname.clone(),
            },
            options: EntryOptions {
                scan_interval: entry.scan_interval,
            },
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Validate everything a session would depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global()?;
        self.config_entries()?;
        Ok(())
    }

    /// Integration-wide settings.
    pub fn global(&self) -> Result<GlobalConfig, ConfigError> {
        let local_ip = self
            .local_ip
            .as_deref()
            .map(GlobalConfig::parse_local_ip)
            .transpose()
            .map_err(|e| validation("local_ip", e.to_string()))?;
        if self.discovery_timeout == 0 {
            return Err(validation("discovery_timeout", "must be at least 1 second"));
        }
        if self.default_scan_interval == 0 {
            return Err(validation("default_scan_interval", "must be at least 1 second"));
        }
        Ok(GlobalConfig {
            local_ip,
            discovery_timeout: Some(Duration::from_secs(self.discovery_timeout)),
            default_scan_interval: Some(Duration::from_secs(self.default_scan_interval)),
        })
    }

    /// Validated session entries, rejecting duplicate ids.
    pub fn config_entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| {
                if !seen.insert(entry.entry_id.as_str()) {
                    return Err(validation(
                        "entry_id",
                        format!("duplicate entry '{}'", entry.entry_id),
                    ));
                }
                let converted = ConfigEntry::from(entry);
                converted.validate().map_err(|e| match e {
                    CoreError::ConfigValidation { field, reason } => ConfigError::Validation {
                        field: format!("entries.{}.{field}", entry.entry_id),
                        reason,
                    },
                    other => validation("entries", other.to_string()),
                })?;
                Ok(converted)
            })
            .collect()
    }

    pub fn entry(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    fn entry_mut(&mut self, entry_id: &str) -> Result<&mut Entry, ConfigError> {
        self.entries
            .iter_mut()
            .find(|e| e.entry_id == entry_id)
            .ok_or_else(|| ConfigError::UnknownEntry {
                entry_id: entry_id.into(),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "igdwatch", "igdwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("igdwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then `path`, then `IGDWATCH_*` environment variables.
///
/// Nested keys use a double underscore, so `IGDWATCH_DISCOVERY_TIMEOUT=5`
/// sets the top-level `discovery_timeout`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IGDWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to pretty TOML at `path`, creating parent directories.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── File-backed entry store ─────────────────────────────────────────

/// [`EntryStore`] that writes reconciled values back to a config file.
///
/// Writes that would not change the stored value are skipped.
#[derive(Debug)]
pub struct FileEntryStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl FileEntryStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: Mutex::new(config),
        }
    }

    fn update(
        &self,
        entry_id: &str,
        f: impl FnOnce(&mut Entry) -> bool,
    ) -> Result<(), ConfigError> {
        let mut cfg = self
            .config
            .lock()
            .map_err(|_| validation("config", "config store lock poisoned"))?;
        if !f(cfg.entry_mut(entry_id)?) {
            return Ok(());
        }
        save_config_to(&self.path, &cfg)?;
        debug!(entry_id = %entry_id, path = %self.path.display(), "config entry persisted");
        Ok(())
    }
}

impl EntryStore for FileEntryStore {
    fn set_unique_id(&self, entry_id: &str, unique_id: &str) -> Result<(), CoreError> {
        self.update(entry_id, |entry| {
            replace_if_changed(&mut entry.unique_id, unique_id)
        })
        .map_err(CoreError::from)
    }

    fn set_hostname(&self, entry_id: &str, hostname: &str) -> Result<(), CoreError> {
        self.update(entry_id, |entry| {
            replace_if_changed(&mut entry.hostname, hostname)
        })
        .map_err(CoreError::from)
    }
}

fn replace_if_changed(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        return false;
    }
    *slot = Some(value.to_owned());
    true
}
