use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

use super::{is_success, read_response, transport_error, ApiClient};

const RECOGNIZE_PATH: &str = "/api/recognize";
const DEFAULT_REJECTION: &str = "Authentication failed.";

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "userName")]
    user_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    Matched { user_name: String },
    Rejected { reason: String },
}

/// Remote face matcher. Takes the captured frame as a base64 data URL.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    async fn recognize(&self, image: &str) -> Result<RecognitionOutcome, ApiError>;
}

#[async_trait]
impl RecognitionService for ApiClient {
    async fn recognize(&self, image: &str) -> Result<RecognitionOutcome, ApiError> {
        let response = self
            .http
            .post(self.url(RECOGNIZE_PATH))
            .json(&RecognizeRequest { image })
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_response(response).await?;
        interpret_recognition(status, &body)
    }
}

/// Maps a recognition response to an outcome.
///
/// A body carrying `status` or `error` is an explicit verdict whatever the
/// HTTP status (the backend answers "not recognized" with a 404). Bodies
/// without either are transport failures on non-2xx and malformed on 2xx.
pub fn interpret_recognition(status: u16, body: &str) -> Result<RecognitionOutcome, ApiError> {
    let parsed = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .filter(|value| value.is_object())
        .and_then(|value| serde_json::from_value::<RecognizeResponse>(value).ok());

    let Some(payload) = parsed else {
        return Err(unreadable(status, body));
    };

    if payload.status.is_none() && payload.error.is_none() {
        return Err(unreadable(status, body));
    }

    if is_success(status) && payload.status.as_deref() == Some("success") {
        return match payload.user_name.map(|name| name.trim().to_string()) {
            Some(user_name) if !user_name.is_empty() => Ok(RecognitionOutcome::Matched { user_name }),
            _ => Err(ApiError::Malformed("success response without userName".into())),
        };
    }

    let reason = payload
        .error
        .map(|err| err.trim().to_string())
        .filter(|err| !err.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
    Ok(RecognitionOutcome::Rejected { reason })
}

fn unreadable(status: u16, body: &str) -> ApiError {
    if is_success(status) {
        ApiError::Malformed("response body is not a recognition result".into())
    } else {
        ApiError::Status {
            status,
            body: body.chars().take(200).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn success_with_user_name_matches() {
        let outcome = interpret_recognition(200, r#"{"status":"success","userName":"alice"}"#);
        assert_eq!(outcome, Ok(RecognitionOutcome::Matched { user_name: "alice".into() }));
    }

    #[test]
    fn not_recognized_is_an_explicit_rejection() {
        let outcome =
            interpret_recognition(404, r#"{"status":"fail","error":"User not recognized"}"#);
        assert_eq!(
            outcome,
            Ok(RecognitionOutcome::Rejected { reason: "User not recognized".into() })
        );
    }

    #[test]
    fn rejection_without_message_uses_default() {
        let outcome = interpret_recognition(200, r#"{"status":"fail"}"#);
        assert_eq!(
            outcome,
            Ok(RecognitionOutcome::Rejected { reason: DEFAULT_REJECTION.into() })
        );
    }

    #[test]
    fn success_without_user_name_is_malformed() {
        assert!(matches!(
            interpret_recognition(200, r#"{"status":"success","userName":""}"#),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn gateway_errors_are_transport_failures() {
        assert!(matches!(
            interpret_recognition(502, "<html>Bad Gateway</html>"),
            Err(ApiError::Status { status: 502, .. })
        ));
        assert!(matches!(
            interpret_recognition(500, "{}"),
            Err(ApiError::Status { status: 500, .. })
        ));
        assert!(matches!(interpret_recognition(200, "ok"), Err(ApiError::Malformed(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = client.recognize("data:image/jpeg;base64,AAAA").await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
