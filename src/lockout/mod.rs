pub mod controller;
pub mod state;

pub use controller::LockoutCountdown;
pub use state::{LockState, LOCK_DURATION_SECS};
