// ── Setup session ──
//
// One run of the discovery → build → first refresh → running lifecycle
// for a single config entry. Every resource acquired along the way is
// recorded so that a failed setup and a teardown release exactly what
// was acquired.

use std::sync::Arc;

use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborators::{EntryStore, EntryUpdate, PLATFORMS, PlatformHost};
use crate::config::{ConfigEntry, SessionConfig};
use crate::coordinator::RefreshCoordinator;
use crate::device::DeviceConnector;
use crate::discovery::{DiscoverySource, DiscoveryWaiter};
use crate::error::CoreError;
use crate::model::DeviceHandle;
use crate::registry::DeviceRegistry;

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingDiscovery,
    BuildingDevice,
    FirstRefresh,
    Running,
    Stopped,
    Failed,
}

/// External collaborators a session drives.
#[derive(Clone)]
pub struct SessionContext {
    pub discovery: Arc<dyn DiscoverySource>,
    pub connector: Arc<dyn DeviceConnector>,
    pub entries: Arc<dyn EntryStore>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub platforms: Arc<dyn PlatformHost>,
}

/// One setup session. Cheaply cloneable.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    entry: ConfigEntry,
    config: SessionConfig,
    context: SessionContext,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    resources: Mutex<Resources>,
}

#[derive(Default)]
struct Resources {
    coordinator: Option<RefreshCoordinator>,
    platforms_loaded: bool,
    /// Device whose background activity was started. Tracked apart from
    /// the coordinator, which teardown may already have taken.
    started_device: Option<Arc<DeviceHandle>>,
}

impl Session {
    pub fn new(entry: ConfigEntry, config: SessionConfig, context: SessionContext) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(SessionInner {
                entry,
                config,
                context,
                state,
                cancel: CancellationToken::new(),
                resources: Mutex::new(Resources::default()),
            }),
        }
    }

    pub fn entry(&self) -> &ConfigEntry {
        &self.inner.entry
    }

    pub fn config(&self) -> SessionConfig {
        self.inner.config
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// `true` when both handles refer to the same session.
    pub fn is_same(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The running coordinator, if setup got that far.
    pub async fn coordinator(&self) -> Option<RefreshCoordinator> {
        self.inner.resources.lock().await.coordinator.clone()
    }

    // ── Setup ────────────────────────────────────────────────────

    /// Run the session from `Idle` to `Running`.
    ///
    /// Errors for which [`CoreError::is_not_ready()`] holds mean the
    /// router may well come up later; the caller should retry with a
    /// fresh session. Calling this on a session that is not `Idle`
    /// fails with [`CoreError::InvalidState`] without side effects.
    pub async fn setup(&self) -> Result<RefreshCoordinator, CoreError> {
        let entered = self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Idle {
                *state = SessionState::AwaitingDiscovery;
                true
            } else {
                false
            }
        });
        if !entered {
            return Err(CoreError::InvalidState {
                operation: "set up".into(),
                state: self.state().to_string(),
            });
        }

        let cancel = self.inner.cancel.clone();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::SessionStopped),
            result = self.run_setup() => result,
        };
        // Teardown may land between the last await point and completion.
        let result = result.and_then(|coordinator| self.ensure_active().map(|()| coordinator));

        match result {
            Ok(coordinator) => Ok(coordinator),
            Err(err) => {
                debug!(entry_id = %self.inner.entry.entry_id, error = %err, "setup failed");
                self.release().await;
                self.transition(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn run_setup(&self) -> Result<RefreshCoordinator, CoreError> {
        let entry = &self.inner.entry;
        let context = &self.inner.context;
        let identity = entry.identity();
        debug!(entry_id = %entry.entry_id, usn = %identity, "setting up config entry");

        let event = DiscoveryWaiter::new(Arc::clone(&context.discovery))
            .with_timeout(self.inner.config.discovery_timeout)
            .wait(&identity)
            .await?;

        self.transition(SessionState::BuildingDevice);
        let (description, client) = context.connector.connect(&event.location).await?;
        let device = DeviceHandle::new(
            event.location,
            identity.service_type(),
            description,
            client,
        )?;

        let update = EntryUpdate::reconcile(entry, &device);
        if !update.is_empty() {
            debug!(entry_id = %entry.entry_id, ?update, "updating stored entry");
            update.apply(context.entries.as_ref(), &entry.entry_id)?;
        }
        context
            .registry
            .get_or_create(&entry.entry_id, &device.device_info())?;

        debug!(
            entry_id = %entry.entry_id,
            interval_secs = self.inner.config.scan_interval.as_secs(),
            "creating refresh coordinator"
        );
        let coordinator = RefreshCoordinator::new(
            device,
            self.inner.config.scan_interval,
            self.inner.cancel.child_token(),
        );
        self.inner.resources.lock().await.coordinator = Some(coordinator.clone());

        self.transition(SessionState::FirstRefresh);
        coordinator.first_refresh().await?;

        debug!(entry_id = %entry.entry_id, "enabling platforms");
        context
            .platforms
            .setup_platforms(&entry.entry_id, &PLATFORMS, coordinator.clone())
            .await?;
        self.inner.resources.lock().await.platforms_loaded = true;

        self.ensure_active()?;
        // Recorded first so an interrupted start is still stopped.
        self.inner.resources.lock().await.started_device = Some(Arc::clone(coordinator.device()));
        coordinator.device().client().start().await?;

        coordinator.start().await;
        self.transition(SessionState::Running);
        info!(
            entry_id = %entry.entry_id,
            device = %coordinator.name(),
            location = %coordinator.device().location(),
            "router ready"
        );
        Ok(coordinator)
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Stop the timer, stop the device's background activity and unload
    /// platforms. Safe on sessions that never started, already stopped,
    /// or failed.
    pub async fn teardown(&self) {
        debug!(entry_id = %self.inner.entry.entry_id, state = %self.state(), "tearing down session");
        self.inner.cancel.cancel();
        self.release().await;

        self.inner.state.send_if_modified(|state| {
            if matches!(*state, SessionState::Stopped | SessionState::Failed) {
                false
            } else {
                *state = SessionState::Stopped;
                true
            }
        });
    }

    /// Release everything recorded in `resources`, best effort.
    async fn release(&self) {
        let entry_id = &self.inner.entry.entry_id;
        let mut resources = self.inner.resources.lock().await;

        if let Some(coordinator) = resources.coordinator.take() {
            coordinator.shutdown().await;
        }
        if let Some(device) = resources.started_device.take() {
            if let Err(e) = device.client().stop().await {
                warn!(entry_id = %entry_id, error = %e, "stopping device failed (non-fatal)");
            }
        }

        if std::mem::take(&mut resources.platforms_loaded) {
            match self
                .inner
                .context
                .platforms
                .unload_platforms(entry_id, &PLATFORMS)
                .await
            {
                Ok(true) => debug!(entry_id = %entry_id, "platforms unloaded"),
                Ok(false) => debug!(entry_id = %entry_id, "no platforms were loaded"),
                Err(e) => warn!(entry_id = %entry_id, error = %e, "unloading platforms failed (non-fatal)"),
            }
        }
    }

    fn ensure_active(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionStopped);
        }
        Ok(())
    }

    /// Move to `next` unless teardown already stopped the session.
    fn transition(&self, next: SessionState) {
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Stopped {
                return false;
            }
            debug!(entry_id = %self.inner.entry.entry_id, from = %state, to = %next, "session transition");
            *state = next;
            true
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("entry_id", &self.inner.entry.entry_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
