// ── Integration manager ──
//
// Holds integration-wide settings and the running session of every
// loaded config entry.

use std::net::IpAddr;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::config::{ConfigEntry, GlobalConfig, SessionConfig};
use crate::coordinator::RefreshCoordinator;
use crate::error::CoreError;
use crate::network::resolve_local_ip;
use crate::session::{Session, SessionContext};

pub struct IgdManager {
    global: GlobalConfig,
    local_ip: Option<IpAddr>,
    context: SessionContext,
    sessions: DashMap<String, Session>,
}

impl IgdManager {
    /// Create a manager, resolving the local source address once.
    pub async fn new(global: GlobalConfig, context: SessionContext) -> Self {
        let local_ip = resolve_local_ip(global.local_ip).await;
        debug!(?local_ip, "resolved local source address");
        Self::with_local_ip(global, context, local_ip)
    }

    /// Create a manager with an already-resolved source address.
    pub fn with_local_ip(
        global: GlobalConfig,
        context: SessionContext,
        local_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            global,
            local_ip,
            context,
            sessions: DashMap::new(),
        }
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    pub fn local_ip(&self) -> Option<IpAddr> {
        self.local_ip
    }

    /// Set up one config entry. Only successful sessions are kept.
    ///
    /// The entry id is reserved before setup starts, so a concurrent
    /// setup of the same entry is rejected instead of racing it.
    pub async fn setup_entry(&self, entry: ConfigEntry) -> Result<RefreshCoordinator, CoreError> {
        entry.validate()?;
        let entry_id = entry.entry_id.clone();

        let session = match self.sessions.entry(entry_id.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::InvalidState {
                    operation: format!("set up entry '{entry_id}'"),
                    state: "loaded".into(),
                });
            }
            Entry::Vacant(slot) => {
                let config = SessionConfig::for_entry(&entry, &self.global);
                let session = Session::new(entry, config, self.context.clone());
                slot.insert(session.clone());
                session
            }
        };

        match session.setup().await {
            Ok(coordinator) => {
                info!(entry_id = %entry_id, "config entry loaded");
                Ok(coordinator)
            }
            Err(err) => {
                // An unload may already have replaced or removed the slot.
                self.sessions
                    .remove_if(&entry_id, |_, stored| stored.is_same(&session));
                Err(err)
            }
        }
    }

    /// Tear down and forget an entry's session. Returns `false` when the
    /// entry was not loaded.
    pub async fn unload_entry(&self, entry_id: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(entry_id) else {
            debug!(entry_id = %entry_id, "unload requested for unknown entry");
            return false;
        };
        session.teardown().await;
        info!(entry_id = %entry_id, "config entry unloaded");
        true
    }

    pub fn session(&self, entry_id: &str) -> Option<Session> {
        self.sessions.get(entry_id).map(|s| s.value().clone())
    }

    /// Ids of loaded entries, including entries still being set up.
    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Unload every entry.
    pub async fn shutdown(&self) {
        for entry_id in self.entry_ids() {
            self.unload_entry(&entry_id).await;
        }
    }
}
