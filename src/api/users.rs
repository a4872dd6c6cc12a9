use async_trait::async_trait;

use crate::{
    directory::{normalize_listing, DirectoryUser},
    error::ApiError,
    navigation::Route,
};

use super::{error_field, is_success, read_response, transport_error, ApiClient};

const USERS_PATH: &str = "/api/users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryListing {
    Users(Vec<DirectoryUser>),
    /// The server refused the admin credentials.
    Redirect(Route),
}

#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list_users(&self) -> Result<DirectoryListing, ApiError>;
}

#[async_trait]
impl DirectorySource for ApiClient {
    async fn list_users(&self) -> Result<DirectoryListing, ApiError> {
        let request = self.authorized(self.http.get(self.url(USERS_PATH)));
        let response = request.send().await.map_err(transport_error)?;
        let (status, body) = read_response(response).await?;
        interpret_directory(status, &body)
    }
}

impl ApiClient {
    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let request = self.authorized(self.http.delete(self.url(&format!("{USERS_PATH}/{id}"))));
        let response = request.send().await.map_err(transport_error)?;
        let (status, body) = read_response(response).await?;

        match status {
            401 | 403 => Err(ApiError::Unauthorized(status)),
            _ if is_success(status) => Ok(()),
            _ => Err(ApiError::Rejected(
                error_field(&body).unwrap_or_else(|| format!("Delete failed (status {status})")),
            )),
        }
    }
}

pub fn interpret_directory(status: u16, body: &str) -> Result<DirectoryListing, ApiError> {
    if status == 401 || status == 403 {
        return Ok(DirectoryListing::Redirect(Route::AdminLogin));
    }
    if !is_success(status) {
        return Err(ApiError::Status {
            status,
            body: body.chars().take(200).collect(),
        });
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|err| ApiError::Malformed(format!("expected JSON user list: {err}")))?;
    Ok(DirectoryListing::Users(normalize_listing(&value)))
}
