// ── Device collaborators ──
//
// The SOAP/HTTP side of a router lives behind these traits. The core
// only sequences calls and merges results.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::CoreError;
use crate::model::{DeviceDescription, Mapping};

/// Queries against one located router.
#[async_trait]
pub trait IgdClient: Send + Sync {
    /// Traffic counters (`bytes_received`, `bytes_sent`, ...).
    async fn traffic_data(&self) -> Result<Mapping, CoreError>;

    /// Connection status (`wan_status`, `ip`, `uptime`).
    async fn status(&self) -> Result<Mapping, CoreError>;

    /// Start the device's own background activity (event subscriptions,
    /// counter polling). Called once the session is running.
    async fn start(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Stop background activity. Must tolerate being called when
    /// nothing was started.
    async fn stop(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Fetches the description document behind a discovered location.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Fail with [`CoreError::DeviceFetch`] when the document is
    /// unreachable or malformed.
    async fn connect(
        &self,
        location: &Url,
    ) -> Result<(DeviceDescription, Arc<dyn IgdClient>), CoreError>;
}
