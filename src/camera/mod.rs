pub mod controller;
pub mod device;
pub mod state;

pub use controller::CameraController;
pub use device::{CaptureBackend, CapturedFrame, DeviceBinding, RawFrame, StillImageBackend};
pub use state::{CaptureDevice, DeviceStatus};
