//! HTTP boundary to the recognition backend.
//!
//! Each endpoint lives in its own file as an `impl ApiClient` block. Response
//! interpretation is kept in plain functions over `(status, body)` so it can
//! be exercised without a server.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response};

use crate::{error::ApiError, settings::{ApiAuth, Settings}};

pub mod login_events;
pub mod recognition;
pub mod registration;
pub mod server_logs;
pub mod users;

pub use login_events::{LoginEvent, LoginEventFeed, LoginStatus};
pub use recognition::{RecognitionOutcome, RecognitionService};
pub use registration::RegistrationForm;
pub use users::{DirectoryListing, DirectorySource};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    auth: Option<ApiAuth>,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            auth: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(&settings.api_base_url, settings.request_timeout())?
            .with_auth(settings.api_auth.clone()))
    }

    pub fn with_auth(mut self, auth: Option<ApiAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(auth) => {
                let (header, value) = auth.header_pair();
                request.header(header, value)
            }
            None => request,
        }
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

/// Status code and body text; failing to read the body is a transport fault.
pub(crate) async fn read_response(response: Response) -> Result<(u16, String), ApiError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    Ok((status, body))
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// `error` field of a JSON object body, when present and non-empty.
pub(crate) fn error_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|err| err.as_str())
        .map(str::trim)
        .filter(|err| !err.is_empty())
        .map(str::to_string)
}
