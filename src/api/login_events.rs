use serde::{Deserialize, Serialize};

use crate::error::ApiError;

use super::{is_success, read_response, transport_error, ApiClient};

const LOGIN_LOGS_PATH: &str = "/api/login-logs";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum LoginStatus {
    Success,
    Failed,
    Locked,
    Other(String),
}

impl Default for LoginStatus {
    fn default() -> Self {
        LoginStatus::Other(String::new())
    }
}

impl From<String> for LoginStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => LoginStatus::Success,
            "failed" | "fail" => LoginStatus::Failed,
            "locked" => LoginStatus::Locked,
            _ => LoginStatus::Other(value),
        }
    }
}

impl From<LoginStatus> for String {
    fn from(status: LoginStatus) -> Self {
        match status {
            LoginStatus::Success => "success".into(),
            LoginStatus::Failed => "failed".into(),
            LoginStatus::Locked => "locked".into(),
            LoginStatus::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginEvent {
    #[serde(default, alias = "timestamp")]
    pub time: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub status: LoginStatus,
}

impl LoginEvent {
    pub fn is_locked(&self) -> bool {
        self.status == LoginStatus::Locked
    }
}

/// Login-event feed, most recent entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginEventFeed {
    #[serde(default)]
    pub logs: Vec<LoginEvent>,
}

impl LoginEventFeed {
    pub fn latest(&self) -> Option<&LoginEvent> {
        self.logs.first()
    }
}

impl ApiClient {
    pub async fn fetch_login_events(&self) -> Result<LoginEventFeed, ApiError> {
        let response = self
            .http
            .get(self.url(LOGIN_LOGS_PATH))
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_response(response).await?;
        interpret_feed(status, &body)
    }
}

pub fn interpret_feed(status: u16, body: &str) -> Result<LoginEventFeed, ApiError> {
    if !is_success(status) {
        return Err(ApiError::Status {
            status,
            body: body.chars().take(200).collect(),
        });
    }
    serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_entry_drives_lock_detection() {
        let feed = interpret_feed(
            200,
            r#"{"logs":[
                {"time":"2024-06-01T10:00:05","username":"unknown","status":"locked"},
                {"time":"2024-06-01T10:00:00","username":"unknown","status":"failed"}
            ]}"#,
        )
        .unwrap();

        assert!(feed.latest().unwrap().is_locked());
        assert_eq!(feed.logs[1].status, LoginStatus::Failed);
    }

    #[test]
    fn accepts_backend_spellings() {
        let feed = interpret_feed(
            200,
            r#"{"logs":[{"timestamp":"2024-06-01T10:00:00","username":"bob","status":"fail"}]}"#,
        )
        .unwrap();
        let event = feed.latest().unwrap();
        assert_eq!(event.time, "2024-06-01T10:00:00");
        assert_eq!(event.status, LoginStatus::Failed);
    }

    #[test]
    fn unknown_statuses_are_kept_verbatim() {
        let feed = interpret_feed(200, r#"{"logs":[{"username":"x","status":"pending"}]}"#).unwrap();
        assert_eq!(feed.logs[0].status, LoginStatus::Other("pending".into()));
        assert_eq!(String::from(feed.logs[0].status.clone()), "pending");
    }

    #[test]
    fn missing_logs_key_is_an_empty_feed() {
        let feed = interpret_feed(200, r#"{"error":"history unavailable"}"#).unwrap();
        assert!(feed.latest().is_none());
        assert!(interpret_feed(500, "oops").is_err());
    }
}
