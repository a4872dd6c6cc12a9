//! Error taxonomy for the login flow.
//!
//! Every error here is recoverable: views turn it into a [`StatusBanner`]
//! and offer a retry instead of tearing down.

use serde::Serialize;
use thiserror::Error;

use crate::recognition::AttemptPhase;

/// Failure of the capture hardware or its binding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Camera access denied. Please check your permissions.")]
    PermissionDenied,
    #[error("Camera not available. Please check that it is connected.")]
    Unavailable,
    #[error("Camera is in use by another application.")]
    Busy,
    #[error("Camera is taking longer than expected to initialize.")]
    TimedOut,
    #[error("Camera error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera not ready. Please wait or retry camera initialization.")]
    Unavailable,
    #[error("Failed to capture image: {0}")]
    Failed(String),
}

/// Failure talking to the remote service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Error connecting to server.")]
    Transport(String),
    #[error("Server responded with status {status}")]
    Status { status: u16, body: String },
    #[error("Malformed response from server: {0}")]
    Malformed(String),
    #[error("Not authorized (status {0})")]
    Unauthorized(u16),
    /// The server understood the request and refused it.
    #[error("{0}")]
    Rejected(String),
}

/// Refusals and failures surfaced by the authentication controllers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Camera is not ready. Please wait or retry camera initialization.")]
    CameraNotReady,
    #[error("A recognition attempt is already in progress.")]
    AttemptInFlight,
    #[error("Retry is only available after a failed attempt (current phase: {0:?}).")]
    RetryNotPermitted(AttemptPhase),
    #[error("The login view has been closed.")]
    TornDown,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("Invalid admin credentials.")]
    AdminRejected,
    #[error("Admin login is not configured.")]
    AdminDisabled,
}

/// What a view shows for a state or failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusBanner {
    pub message: String,
    pub can_retry: bool,
}

impl StatusBanner {
    pub fn new(message: impl Into<String>, can_retry: bool) -> Self {
        Self {
            message: message.into(),
            can_retry,
        }
    }
}

impl From<&DeviceError> for StatusBanner {
    fn from(err: &DeviceError) -> Self {
        StatusBanner::new(err.to_string(), true)
    }
}

impl From<&CaptureError> for StatusBanner {
    fn from(err: &CaptureError) -> Self {
        StatusBanner::new(err.to_string(), true)
    }
}

impl From<&ApiError> for StatusBanner {
    fn from(err: &ApiError) -> Self {
        StatusBanner::new(err.to_string(), true)
    }
}

impl From<&AuthError> for StatusBanner {
    fn from(err: &AuthError) -> Self {
        let can_retry = !matches!(err, AuthError::TornDown | AuthError::AdminDisabled);
        StatusBanner::new(err.to_string(), can_retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_read_as_connection_problems() {
        let banner = StatusBanner::from(&ApiError::Transport("refused".into()));
        assert_eq!(banner.message, "Error connecting to server.");
        assert!(banner.can_retry);
    }

    #[test]
    fn torn_down_views_do_not_offer_retry() {
        assert!(!StatusBanner::from(&AuthError::TornDown).can_retry);
        assert!(StatusBanner::from(&AuthError::CameraNotReady).can_retry);
    }

    #[test]
    fn capture_errors_convert_into_auth_errors() {
        let err: AuthError = CaptureError::Failed("no data".into()).into();
        assert_eq!(err.to_string(), "Failed to capture image: no data");
    }
}
