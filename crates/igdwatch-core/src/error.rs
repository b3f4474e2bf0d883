// ── Core error types ──
//
// User-facing errors from igdwatch-core. Collaborators (discovery
// transports, device clients, entry stores) report their failures
// through these variants so the session can decide whether an attempt
// is merely "not ready" or broken.

use std::sync::Arc;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup errors (retry the whole setup later) ───────────────────
    #[error("Device {usn} was not discovered within {timeout_secs}s")]
    DiscoveryTimeout { usn: String, timeout_secs: u64 },

    #[error("Cannot fetch device description from {location}: {reason}")]
    DeviceFetch { location: String, reason: String },

    #[error("First refresh of {device} failed: {source}")]
    FirstRefreshFailed {
        device: String,
        #[source]
        source: Arc<CoreError>,
    },

    // ── Refresh errors ───────────────────────────────────────────────
    #[error("{operation} failed: {message}")]
    Network { operation: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Cannot {operation} while session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("Session stopped")]
    SessionStopped,

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Registry error: {message}")]
    Registry { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when the failed setup attempt should be retried later
    /// rather than treated as a permanent failure.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryTimeout { .. }
                | Self::DeviceFetch { .. }
                | Self::FirstRefreshFailed { .. }
        )
    }
}
