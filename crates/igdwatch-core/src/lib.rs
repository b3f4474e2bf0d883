//! Discovery-to-ready lifecycle and periodic refresh for UPnP/IGD routers.
//!
//! This crate owns the state machine that turns a stored router identity
//! into a running, failure-tolerant statistics poller:
//!
//! - **[`DiscoveryWaiter`]** - Registers a USN-filtered callback with a
//!   [`DiscoverySource`] and waits (bounded) for the router to announce its
//!   description `LOCATION`. The subscription is a scoped [`Subscription`]
//!   guard, released on every exit path.
//!
//! - **[`DeviceHandle`]** - Immutable view of a located router (identity,
//!   location, hostname, display metadata) plus the [`IgdClient`] used to
//!   query it. Built by a [`DeviceConnector`].
//!
//! - **[`RefreshCoordinator`]** - Runs traffic and status queries
//!   concurrently, merges them into one [`RefreshSnapshot`], and publishes
//!   [`CoordinatorState`] through a `watch` channel. Cycles are serialized;
//!   overlapping requests coalesce onto the in-flight cycle.
//!
//! - **[`Session`]** - One setup attempt: `Idle → AwaitingDiscovery →
//!   BuildingDevice → FirstRefresh → Running → Stopped` (or `Failed`).
//!
//! - **[`IgdManager`]** - Resolves the local source IP once and keeps the
//!   running sessions keyed by config entry id.
//!
//! Wire protocols (SSDP, SOAP) are not implemented here; they plug in
//! through the collaborator traits in [`discovery`], [`device`] and
//! [`collaborators`].

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod model;
pub mod network;
pub mod registry;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collaborators::{EntryStore, EntryUpdate, MemoryEntryStore, PLATFORMS, Platform, PlatformHost};
pub use config::{ConfigEntry, EntryData, EntryOptions, GlobalConfig, SessionConfig};
pub use coordinator::{CoordinatorState, RefreshCoordinator, RefreshOutcome};
pub use device::{DeviceConnector, IgdClient};
pub use discovery::{
    DiscoveryCallback, DiscoveryHub, DiscoverySource, DiscoveryWaiter, Subscription,
};
pub use error::CoreError;
pub use manager::IgdManager;
pub use model::{
    DeviceDescription, DeviceHandle, DeviceIdentity, DeviceInfo, DiscoveryEvent, Mapping,
    RefreshSnapshot,
};
pub use registry::{DeviceRegistry, InMemoryRegistry, RegisteredDevice};
pub use session::{Session, SessionContext, SessionState};
