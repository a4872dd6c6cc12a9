pub mod controller;
pub mod state;

pub use controller::RecognitionController;
pub use state::{AttemptPhase, FailureReason, RecognitionAttempt};
