//! Error types for the Lifeline environment abstraction.

use thiserror::Error;

/// Errors delivered by a location watch.
///
/// These mirror the failure codes of the underlying device sensor and are
/// user-actionable: the UI surfaces them with a retry or settings prompt.
/// Only `PermissionDenied` terminates the active tracking session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user denied (or revoked) location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// The sensor could not produce a fix
    #[error("Location information unavailable")]
    Unavailable,

    /// No fix arrived within the requested timeout
    #[error("Location request timed out after {0}ms")]
    Timeout(u64),
}

impl LocationError {
    /// Whether the active session must stop on this error.
    ///
    /// Transient errors keep the watch alive in case the sensor recovers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LocationError::PermissionDenied)
    }
}

/// Errors reported by the map renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The render target (map container) is not ready yet.
    ///
    /// Purely internal: callers degrade to a no-op and retry once the
    /// renderer is ready, never surfacing this as a hard failure.
    #[error("Render target missing")]
    RenderTargetMissing,
}
