// ── Discovery ──
//
// Bridges the callback-style discovery transport into a bounded wait.
// A transport (SSDP listener, mDNS bridge, test fixture) publishes
// `DiscoveryEvent`s into a `DiscoverySource`; the waiter registers a
// USN-filtered callback, resolves on the first match, and always
// releases its registration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::config::DEFAULT_DISCOVERY_TIMEOUT;
use crate::error::CoreError;
use crate::model::{DeviceIdentity, DiscoveryEvent};

/// Callback invoked by a discovery source for each matching event.
pub type DiscoveryCallback = Arc<dyn Fn(&DiscoveryEvent) + Send + Sync>;

/// The discovery collaborator: a registry of filtered callbacks.
pub trait DiscoverySource: Send + Sync {
    /// Register `callback` for announcements whose USN matches
    /// `identity`. Dropping or cancelling the returned guard
    /// unregisters it.
    fn register(&self, identity: &DeviceIdentity, callback: DiscoveryCallback) -> Subscription;
}

// ── Subscription ─────────────────────────────────────────────────

/// Scoped discovery registration. Unregisters at most once, either on
/// [`cancel()`](Self::cancel) or on drop.
#[must_use = "dropping a Subscription unregisters the callback immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister now. Further calls are no-ops.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ── DiscoveryWaiter ──────────────────────────────────────────────

/// Waits for one router to announce itself.
pub struct DiscoveryWaiter {
    source: Arc<dyn DiscoverySource>,
    timeout: Duration,
}

impl DiscoveryWaiter {
    pub fn new(source: Arc<dyn DiscoverySource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve the first announcement matching `identity`, or fail with
    /// [`CoreError::DiscoveryTimeout`] once the budget is spent.
    pub async fn wait(&self, identity: &DeviceIdentity) -> Result<DiscoveryEvent, CoreError> {
        let usn = identity.usn();
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let filter = identity.clone();

        let callback: DiscoveryCallback = Arc::new(move |event: &DiscoveryEvent| {
            if !filter.matches(&event.usn) {
                trace!(usn = %event.usn, "ignoring non-matching announcement");
                return;
            }
            let sender = slot.lock().ok().and_then(|mut guard| guard.take());
            if let Some(sender) = sender {
                let _ = sender.send(event.clone());
            }
        });

        // Released on every exit path, including when this future is dropped.
        let mut subscription = self.source.register(identity, callback);
        let outcome = tokio::time::timeout(self.timeout, rx).await;
        subscription.cancel();

        match outcome {
            Ok(Ok(event)) => {
                debug!(usn = %usn, location = %event.location, "device discovered");
                Ok(event)
            }
            Ok(Err(_)) => Err(CoreError::Internal(format!(
                "discovery source released the callback for {usn} without an announcement"
            ))),
            Err(_) => {
                let timeout_secs = ceil_secs(self.timeout);
                debug!(usn = %usn, timeout_secs, "device not discovered");
                Err(CoreError::DiscoveryTimeout { usn, timeout_secs })
            }
        }
    }
}

/// Whole seconds, rounded up.
fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

// ── DiscoveryHub ─────────────────────────────────────────────────

struct Registration {
    identity: DeviceIdentity,
    callback: DiscoveryCallback,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    registrations: DashMap<u64, Registration>,
    /// Last announcement per USN, replayed to late registrations.
    seen: DashMap<String, DiscoveryEvent>,
}

/// In-process discovery callback registry.
///
/// A transport feeds announcements through [`publish()`](Self::publish);
/// registrations made after a device was already seen are served the
/// cached announcement immediately.
#[derive(Clone, Default)]
pub struct DiscoveryHub {
    inner: Arc<HubInner>,
}

impl DiscoveryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an announcement and notify matching registrations.
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, event: DiscoveryEvent) -> usize {
        self.inner.seen.insert(event.usn.clone(), event.clone());

        // Collect first so callbacks run without holding shard locks.
        let targets: Vec<DiscoveryCallback> = self
            .inner
            .registrations
            .iter()
            .filter(|r| r.identity.matches(&event.usn))
            .map(|r| Arc::clone(&r.callback))
            .collect();

        for callback in &targets {
            callback(&event);
        }
        targets.len()
    }

    /// Drop the cached announcement for a device that said goodbye.
    pub fn expire(&self, usn: &str) -> bool {
        self.inner.seen.remove(usn).is_some()
    }

    pub fn registration_count(&self) -> usize {
        self.inner.registrations.len()
    }
}

impl DiscoverySource for DiscoveryHub {
    fn register(&self, identity: &DeviceIdentity, callback: DiscoveryCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.registrations.insert(
            id,
            Registration {
                identity: identity.clone(),
                callback: Arc::clone(&callback),
            },
        );

        let cached = self
            .inner
            .seen
            .get(&identity.usn())
            .map(|event| event.value().clone());
        if let Some(event) = cached {
            callback(&event);
        }

        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.registrations.remove(&id);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};
    use url::Url;

    use super::{DiscoveryCallback, DiscoveryHub, DiscoverySource, DiscoveryWaiter, Subscription};
    use crate::error::CoreError;
    use crate::model::{DeviceIdentity, DiscoveryEvent};

    const ST: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("uuid:udn123", ST)
    }

    fn event(usn: &str) -> DiscoveryEvent {
        DiscoveryEvent::new(
            usn,
            Url::parse("http://192.168.1.1:1900/desc.xml").expect("valid URL"),
        )
    }

    /// Wraps a hub and counts registrations and unregistrations.
    #[derive(Default)]
    struct CountingSource {
        hub: DiscoveryHub,
        registered: Arc<AtomicUsize>,
        unregistered: Arc<AtomicUsize>,
    }

    impl DiscoverySource for CountingSource {
        fn register(&self, identity: &DeviceIdentity, callback: DiscoveryCallback) -> Subscription {
            self.registered.fetch_add(1, Ordering::SeqCst);
            let mut inner = self.hub.register(identity, callback);
            let unregistered = Arc::clone(&self.unregistered);
            Subscription::new(move || {
                unregistered.fetch_add(1, Ordering::SeqCst);
                inner.cancel();
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_matching_event_before_timeout() {
        let hub = DiscoveryHub::new();
        let waiter = DiscoveryWaiter::new(Arc::new(hub.clone()));
        let publisher = hub.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            publisher.publish(event(&identity().usn()));
        });

        let found = waiter.wait(&identity()).await.expect("discovered");
        assert_eq!(found.location.as_str(), "http://192.168.1.1:1900/desc.xml");
        assert_eq!(hub.registration_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_non_matching_events() {
        let hub = DiscoveryHub::new();
        let waiter = DiscoveryWaiter::new(Arc::new(hub.clone()));
        let publisher = hub.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            publisher.publish(event(&format!("uuid:other::{ST}")));
            tokio::time::sleep(Duration::from_secs(1)).await;
            let mut hit = event(&identity().usn());
            hit.location = Url::parse("http://10.0.0.1/igd.xml").expect("valid URL");
            publisher.publish(hit);
        });

        let found = waiter.wait(&identity()).await.expect("discovered");
        assert_eq!(found.location.host_str(), Some("10.0.0.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_unregisters_once() {
        let source = Arc::new(CountingSource::default());
        let waiter = DiscoveryWaiter::new(Arc::clone(&source) as Arc<dyn DiscoverySource>);
        let started = tokio::time::Instant::now();

        let result = waiter.wait(&identity()).await;

        assert!(
            matches!(result, Err(CoreError::DiscoveryTimeout { timeout_secs: 10, .. })),
            "expected DiscoveryTimeout, got: {result:?}"
        );
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(source.registered.load(Ordering::SeqCst), 1);
        assert_eq!(source.unregistered.load(Ordering::SeqCst), 1);
        assert_eq!(source.hub.registration_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_reports_whole_seconds() {
        let waiter = DiscoveryWaiter::new(Arc::new(DiscoveryHub::new()))
            .with_timeout(Duration::from_millis(500));

        let result = waiter.wait(&identity()).await;

        assert!(
            matches!(result, Err(CoreError::DiscoveryTimeout { timeout_secs: 1, .. })),
            "got: {result:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_unregisters_once() {
        let source = Arc::new(CountingSource::default());
        source.hub.publish(event(&identity().usn()));
        let waiter = DiscoveryWaiter::new(Arc::clone(&source) as Arc<dyn DiscoverySource>);

        assert_ok!(waiter.wait(&identity()).await);

        assert_eq!(source.registered.load(Ordering::SeqCst), 1);
        assert_eq!(source.unregistered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_unregisters_once() {
        let source = Arc::new(CountingSource::default());
        let waiter = DiscoveryWaiter::new(Arc::clone(&source) as Arc<dyn DiscoverySource>)
            .with_timeout(Duration::from_secs(30));

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), waiter.wait(&identity())).await;

        assert_err!(abandoned);
        assert_eq!(source.registered.load(Ordering::SeqCst), 1);
        assert_eq!(source.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_cancel_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.cancel();
        subscription.cancel();
        assert!(!subscription.is_active());
        drop(subscription);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hub_publish_reaches_only_matching_registrations() {
        let hub = DiscoveryHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _subscription = hub.register(
            &identity(),
            Arc::new(move |_: &DiscoveryEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(hub.publish(event(&format!("uuid:other::{ST}"))), 0);
        assert_eq!(hub.publish(event(&identity().usn())), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(hub.expire(&identity().usn()));
        assert!(!hub.expire(&identity().usn()));
    }
}
