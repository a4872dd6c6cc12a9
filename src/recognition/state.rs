use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, StatusBanner};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum AttemptPhase {
    Idle,
    Capturing,
    Submitting,
    Succeeded,
    Failed,
}

impl Default for AttemptPhase {
    fn default() -> Self {
        AttemptPhase::Idle
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureReason {
    /// The server looked at the face and said no.
    Rejected { message: String },
    /// No usable answer; `status` is set when the server did reply.
    Transport { status: Option<u16> },
    Malformed { detail: String },
    Capture { message: String },
}

impl FailureReason {
    pub fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::Transport(_) => FailureReason::Transport { status: None },
            ApiError::Status { status, .. } | ApiError::Unauthorized(status) => {
                FailureReason::Transport {
                    status: Some(*status),
                }
            }
            ApiError::Malformed(detail) => FailureReason::Malformed {
                detail: detail.clone(),
            },
            ApiError::Rejected(message) => FailureReason::Rejected {
                message: message.clone(),
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            FailureReason::Rejected { message } | FailureReason::Capture { message } => {
                message.clone()
            }
            FailureReason::Transport { status: None } => "Error connecting to server.".into(),
            FailureReason::Transport {
                status: Some(status),
            } => format!("Error connecting to server (status {status})."),
            FailureReason::Malformed { .. } => "Unexpected response from server.".into(),
        }
    }
}

/// One capture→submit→result cycle. Never reused: retry builds a new one.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionAttempt {
    pub id: Uuid,
    pub phase: AttemptPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_frame: Option<String>,
    pub result_user_name: Option<String>,
    pub failure_reason: Option<FailureReason>,
}

impl Default for RecognitionAttempt {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: AttemptPhase::Idle,
            captured_frame: None,
            result_user_name: None,
            failure_reason: None,
        }
    }
}

impl RecognitionAttempt {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn begin() -> Self {
        Self {
            phase: AttemptPhase::Capturing,
            ..Self::default()
        }
    }

    pub fn frame_captured(&mut self, data_url: String) {
        self.captured_frame = Some(data_url);
        self.phase = AttemptPhase::Submitting;
    }

    pub fn succeed(&mut self, user_name: String) {
        self.phase = AttemptPhase::Succeeded;
        self.result_user_name = Some(user_name);
        self.failure_reason = None;
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.phase = AttemptPhase::Failed;
        self.result_user_name = None;
        self.failure_reason = Some(reason);
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, AttemptPhase::Capturing | AttemptPhase::Submitting)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, AttemptPhase::Succeeded | AttemptPhase::Failed)
    }

    pub fn banner(&self) -> StatusBanner {
        match self.phase {
            AttemptPhase::Idle => StatusBanner::new("Waiting for face detection to start...", false),
            AttemptPhase::Capturing => StatusBanner::new("Capturing image...", false),
            AttemptPhase::Submitting => StatusBanner::new("Processing your face data...", false),
            AttemptPhase::Succeeded => StatusBanner::new(
                format!(
                    "Welcome, {}!",
                    self.result_user_name.as_deref().unwrap_or_default()
                ),
                false,
            ),
            AttemptPhase::Failed => StatusBanner::new(
                self.failure_reason
                    .as_ref()
                    .map(FailureReason::message)
                    .unwrap_or_else(|| "Authentication failed.".into()),
                true,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_follow_the_phase() {
        let mut attempt = RecognitionAttempt::begin();
        assert_eq!(attempt.phase, AttemptPhase::Capturing);
        assert!(attempt.captured_frame.is_none());

        attempt.frame_captured("data:image/jpeg;base64,AA==".into());
        assert_eq!(attempt.phase, AttemptPhase::Submitting);
        assert!(attempt.is_in_flight());

        attempt.succeed("alice".into());
        assert_eq!(attempt.result_user_name.as_deref(), Some("alice"));
        assert_eq!(attempt.banner().message, "Welcome, alice!");
        assert!(!attempt.banner().can_retry);
    }

    #[test]
    fn failures_are_retryable_with_readable_messages() {
        let mut attempt = RecognitionAttempt::begin();
        attempt.fail(FailureReason::from_api(&ApiError::Transport("refused".into())));
        assert_eq!(attempt.banner(), StatusBanner::new("Error connecting to server.", true));

        attempt.fail(FailureReason::from_api(&ApiError::Status {
            status: 502,
            body: String::new(),
        }));
        assert!(attempt.banner().message.contains("502"));

        attempt.fail(FailureReason::from_api(&ApiError::Rejected("User not recognized".into())));
        assert_eq!(attempt.banner().message, "User not recognized");
        assert_eq!(attempt.result_user_name, None);
    }

    #[test]
    fn every_attempt_gets_its_own_id() {
        assert_ne!(RecognitionAttempt::begin().id, RecognitionAttempt::begin().id);
    }
}
