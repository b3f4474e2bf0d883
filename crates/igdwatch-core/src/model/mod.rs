// ── Domain model ──
//
// Canonical types shared by discovery, the session state machine and
// the refresh coordinator.

pub mod device;
pub mod identity;
pub mod snapshot;

pub use device::{CONNECTION_UPNP, DOMAIN, DeviceDescription, DeviceHandle, DeviceInfo};
pub use identity::{DeviceIdentity, DiscoveryEvent};
pub use snapshot::{Mapping, RefreshSnapshot, keys};
