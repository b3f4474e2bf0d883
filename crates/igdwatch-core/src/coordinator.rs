// ── Refresh coordinator ──
//
// Periodically queries one router for traffic counters and connection
// status, merges both results into a `RefreshSnapshot`, and publishes
// the outcome through a `watch` channel.
//
// Cycles are strictly serialized per coordinator. A request that has to
// wait for an in-flight cycle adopts that cycle's outcome instead of
// starting another one (coalesce-by-generation).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{DeviceHandle, RefreshSnapshot};

/// Result of one refresh request.
pub type RefreshOutcome = Result<Arc<RefreshSnapshot>, Arc<CoreError>>;

/// Observable coordinator state. Only the coordinator's own cycles
/// write it.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last-known-good snapshot. Failed cycles leave it untouched.
    pub snapshot: Option<Arc<RefreshSnapshot>>,
    pub last_update_success: bool,
    pub last_error: Option<Arc<CoreError>>,
    pub last_update: Option<DateTime<Utc>>,
    /// Number of completed cycles.
    pub generation: u64,
}

impl CoordinatorState {
    /// Outcome of the most recent cycle.
    pub fn outcome(&self) -> RefreshOutcome {
        match (&self.snapshot, &self.last_error) {
            (Some(snapshot), _) if self.last_update_success => Ok(Arc::clone(snapshot)),
            (_, Some(err)) => Err(Arc::clone(err)),
            _ => Err(Arc::new(CoreError::Internal(
                "no refresh cycle has completed".into(),
            ))),
        }
    }
}

/// Drives the refresh cycle for one [`DeviceHandle`].
///
/// Cheaply cloneable; clones share the same state and cycle lock.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    device: Arc<DeviceHandle>,
    interval: Duration,
    state: watch::Sender<CoordinatorState>,
    /// Held for the whole duration of a cycle.
    cycle: Mutex<()>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshCoordinator {
    /// Create an idle coordinator. Nothing runs until
    /// [`first_refresh()`](Self::first_refresh) or [`start()`](Self::start).
    pub fn new(device: DeviceHandle, interval: Duration, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            inner: Arc::new(CoordinatorInner {
                device: Arc::new(device),
                interval,
                state,
                cycle: Mutex::new(()),
                cancel,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn device(&self) -> &Arc<DeviceHandle> {
        &self.inner.device
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Display name used in logs.
    pub fn name(&self) -> &str {
        self.inner.device.name()
    }

    // ── State observation ────────────────────────────────────────

    /// Point-in-time copy of the coordinator state.
    pub fn state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes. Notified after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn last_snapshot(&self) -> Option<Arc<RefreshSnapshot>> {
        self.inner.state.borrow().snapshot.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.state.borrow().last_update_success
    }

    pub fn last_error(&self) -> Option<Arc<CoreError>> {
        self.inner.state.borrow().last_error.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Mandatory first cycle of a session. A failure here aborts setup.
    pub async fn first_refresh(&self) -> Result<Arc<RefreshSnapshot>, CoreError> {
        self.request_refresh()
            .await
            .map_err(|source| CoreError::FirstRefreshFailed {
                device: self.name().to_owned(),
                source,
            })
    }

    /// Refresh outside the timer.
    ///
    /// If a cycle is already running, waits for it and returns its
    /// outcome without fetching again.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        if self.is_stopped() {
            return Err(Arc::new(CoreError::SessionStopped));
        }
        let observed = self.inner.state.borrow().generation;

        let _cycle = self.inner.cycle.lock().await;
        if self.is_stopped() {
            return Err(Arc::new(CoreError::SessionStopped));
        }

        let current = self.state();
        if current.generation != observed {
            debug!(device = %self.name(), generation = current.generation, "joined completed refresh cycle");
            return current.outcome();
        }

        self.run_cycle().await
    }

    /// One cycle. Caller must hold the cycle lock.
    async fn run_cycle(&self) -> RefreshOutcome {
        let client = self.inner.device.client();
        let (traffic, status) = tokio::join!(client.traffic_data(), client.status());

        let result = match (traffic, status) {
            (Ok(traffic), Ok(status)) => Ok(Arc::new(RefreshSnapshot::merge(traffic, status))),
            (Err(err), _) | (_, Err(err)) => Err(Arc::new(err)),
        };

        self.inner.state.send_modify(|state| {
            state.generation += 1;
            state.last_update = Some(Utc::now());
            match &result {
                Ok(snapshot) => {
                    state.snapshot = Some(Arc::clone(snapshot));
                    state.last_update_success = true;
                    state.last_error = None;
                }
                Err(err) => {
                    state.last_update_success = false;
                    state.last_error = Some(Arc::clone(err));
                }
            }
        });

        match &result {
            Ok(snapshot) => {
                debug!(device = %self.name(), keys = snapshot.values().len(), "refresh succeeded");
            }
            Err(err) => warn!(device = %self.name(), error = %err, "refresh failed"),
        }
        result
    }

    // ── Background timer ─────────────────────────────────────────

    /// Arm the periodic timer. No-op if already armed, stopped, or the
    /// interval is zero.
    pub async fn start(&self) {
        if self.is_stopped() {
            return;
        }
        if self.inner.interval.is_zero() {
            debug!(device = %self.name(), "zero refresh interval, timer not armed");
            return;
        }

        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }
        let cancel = self.inner.cancel.clone();
        *task = Some(tokio::spawn(refresh_task(self.clone(), cancel)));
        info!(
            device = %self.name(),
            interval_secs = self.inner.interval.as_secs(),
            "periodic refresh started"
        );
    }

    /// Stop the timer and wait until no cycle is running. Idempotent.
    ///
    /// Once this returns no further state updates are published.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
            debug!(device = %self.name(), "periodic refresh stopped");
        }

        // Drain a manual cycle that was already past the stop check.
        drop(self.inner.cycle.lock().await);
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("device", &self.inner.device)
            .field("interval", &self.inner.interval)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Periodically refresh the coordinator until cancelled.
async fn refresh_task(coordinator: RefreshCoordinator, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // An in-flight cycle is abandoned on cancellation.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = coordinator.request_refresh() => {}
                }
            }
        }
    }
}
