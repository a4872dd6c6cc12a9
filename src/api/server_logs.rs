use serde::Deserialize;

use crate::error::ApiError;

use super::{is_success, read_response, transport_error, ApiClient};

const LOGS_PATH: &str = "/api/logs";
const NO_LOGS: &str = "No logs found.";

#[derive(Debug, Deserialize)]
struct ServerLogResponse {
    #[serde(default)]
    logs: Option<String>,
}

impl ApiClient {
    /// Tail of the backend's own log file, as plain text.
    pub async fn fetch_server_log(&self) -> Result<String, ApiError> {
        let response = self
            .http
            .get(self.url(LOGS_PATH))
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_response(response).await?;
        interpret_server_log(status, &body)
    }
}

pub fn interpret_server_log(status: u16, body: &str) -> Result<String, ApiError> {
    if !is_success(status) {
        return Err(ApiError::Rejected("Failed to fetch logs".into()));
    }
    let parsed: ServerLogResponse =
        serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))?;
    Ok(parsed
        .logs
        .filter(|logs| !logs.is_empty())
        .unwrap_or_else(|| NO_LOGS.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_logs_fall_back_to_placeholder() {
        assert_eq!(interpret_server_log(200, r#"{"logs":""}"#).unwrap(), NO_LOGS);
        assert_eq!(interpret_server_log(200, "{}").unwrap(), NO_LOGS);
        assert_eq!(
            interpret_server_log(200, r#"{"logs":"INFO: Register endpoint called\n"}"#).unwrap(),
            "INFO: Register endpoint called\n"
        );
        assert!(interpret_server_log(503, "").is_err());
    }
}
