use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, StatusBanner};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
    Uninitialized,
    Initializing,
    Ready,
    Error,
    TimedOut,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus::Uninitialized
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDevice {
    pub status: DeviceStatus,
    pub error_message: Option<String>,
}

impl CaptureDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_initializing(&mut self) {
        self.status = DeviceStatus::Initializing;
        self.error_message = None;
    }

    /// Returns false when the device is not waiting on acquisition.
    pub fn mark_ready(&mut self) -> bool {
        match self.status {
            DeviceStatus::Initializing | DeviceStatus::TimedOut => {
                self.status = DeviceStatus::Ready;
                self.error_message = None;
                true
            }
            _ => false,
        }
    }

    pub fn mark_error(&mut self, err: &DeviceError) {
        self.status = DeviceStatus::Error;
        self.error_message = Some(err.to_string());
    }

    /// Advisory only; a later `mark_ready` still wins.
    pub fn mark_timed_out(&mut self) -> bool {
        if self.status != DeviceStatus::Initializing {
            return false;
        }
        self.status = DeviceStatus::TimedOut;
        self.error_message = Some(DeviceError::TimedOut.to_string());
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_ready(&self) -> bool {
        self.status == DeviceStatus::Ready
    }

    pub fn banner(&self) -> StatusBanner {
        match self.status {
            DeviceStatus::Uninitialized => StatusBanner::new("Camera is off.", true),
            DeviceStatus::Initializing => StatusBanner::new(
                "Initializing camera... Please allow camera access when prompted.",
                false,
            ),
            DeviceStatus::Ready => StatusBanner::new("Camera active", false),
            DeviceStatus::Error | DeviceStatus::TimedOut => StatusBanner::new(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "Camera unavailable.".into()),
                true,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_readiness_overrides_timeout() {
        let mut device = CaptureDevice::new();
        device.begin_initializing();
        assert!(device.mark_timed_out());
        assert!(device.banner().can_retry);
        assert!(device.mark_ready());
        assert_eq!(device.status, DeviceStatus::Ready);
        assert_eq!(device.error_message, None);
    }

    #[test]
    fn timeout_does_not_clobber_ready_or_error() {
        let mut device = CaptureDevice::new();
        device.begin_initializing();
        device.mark_ready();
        assert!(!device.mark_timed_out());

        device.mark_error(&DeviceError::Busy);
        assert!(!device.mark_timed_out());
        assert!(!device.mark_ready());
        assert_eq!(device.status, DeviceStatus::Error);
    }
}
