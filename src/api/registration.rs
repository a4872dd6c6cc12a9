use serde::Serialize;

use crate::error::ApiError;

use super::{error_field, is_success, read_response, transport_error, ApiClient};

const REGISTER_PATH: &str = "/api/register";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Face image as a base64 data URL.
    pub image: Option<String>,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::Rejected("Username and password are required.".into()));
        }
        Ok(())
    }
}

impl ApiClient {
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), ApiError> {
        form.validate()?;

        let response = self
            .http
            .post(self.url(REGISTER_PATH))
            .json(form)
            .send()
            .await
            .map_err(transport_error)?;

        let (status, body) = read_response(response).await?;
        interpret_registration(status, &body)
    }
}

pub fn interpret_registration(status: u16, body: &str) -> Result<(), ApiError> {
    if is_success(status) {
        return Ok(());
    }
    Err(ApiError::Rejected(
        error_field(body).unwrap_or_else(|| "Registration failed.".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_text_is_surfaced() {
        assert_eq!(
            interpret_registration(400, r#"{"error":"Username, password, and image required"}"#),
            Err(ApiError::Rejected("Username, password, and image required".into()))
        );
        assert_eq!(
            interpret_registration(500, ""),
            Err(ApiError::Rejected("Registration failed.".into()))
        );
        assert_eq!(interpret_registration(201, r#"{"status":"success"}"#), Ok(()));
    }

    #[test]
    fn blank_credentials_never_leave_the_client() {
        let form = RegistrationForm {
            username: " ".into(),
            email: "a@example.com".into(),
            password: "pw".into(),
            image: None,
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn absent_image_serializes_as_null() {
        let form = RegistrationForm {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "pw".into(),
            image: None,
        };
        let value = serde_json::to_value(&form).unwrap();
        assert!(value["image"].is_null());
    }
}
