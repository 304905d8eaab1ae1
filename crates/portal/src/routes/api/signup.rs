//! `POST /api/signup`: create an account through the identity service.
//!
//! Roles are not assigned here; the identity service calls back into
//! `/webhooks/identity`, which grants the subscriber role to anyone who
//! already paid.

use axum::{Json, extract::State, http::StatusCode};
use bookvision_core::{Email, UserId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::identity::{IdentityError, SignupData, SignupRequest};
use crate::state::AppState;

/// Shortest accepted password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const MSG_MISSING_FIELDS: &str = "Por favor, preencha todos os campos.";
const MSG_SHORT_PASSWORD: &str = "A senha deve ter no mínimo 6 caracteres.";
const MSG_PASSWORD_MISMATCH: &str = "As senhas não coincidem.";
const MSG_INVALID_EMAIL: &str = "Por favor, informe um email válido.";
const MSG_SIGNUP_FAILED: &str = "Erro ao criar conta. Tente novamente.";

/// The signup form. Accepts both `snake_case` and the form's `camelCase`.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "confirmPassword")]
    pub confirm_password: String,
    #[serde(default, alias = "fullName")]
    pub full_name: String,
}

impl SignupForm {
    /// Check the form and build the identity request.
    ///
    /// # Errors
    ///
    /// Returns the message to show next to the form.
    pub fn validate(self) -> std::result::Result<SignupRequest, &'static str> {
        let full_name = self.full_name.trim();
        if self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
            || full_name.is_empty()
        {
            return Err(MSG_MISSING_FIELDS);
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(MSG_SHORT_PASSWORD);
        }
        if self.password != self.confirm_password {
            return Err(MSG_PASSWORD_MISMATCH);
        }
        let email = Email::parse(&self.email).map_err(|_| MSG_INVALID_EMAIL)?;

        Ok(SignupRequest {
            email,
            data: SignupData {
                full_name: full_name.to_string(),
            },
            password: self.password,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: UserId,
    pub email: String,
}

/// Validate the form and forward it to the identity service.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let request = form
        .validate()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    match state.identity().signup(&request).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Account created");
            Ok((
                StatusCode::CREATED,
                Json(SignupResponse {
                    id: user.id,
                    email: user.email,
                }),
            ))
        }
        Err(IdentityError::Api { status, message }) if status < 500 => {
            tracing::warn!(status, message = %message, "Identity service refused signup");
            let message = if message.is_empty() {
                MSG_SIGNUP_FAILED.to_string()
            } else {
                message
            };
            Err(AppError::BadRequest(message))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str, confirm: &str, name: &str) -> SignupForm {
        SignupForm {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            full_name: name.to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let request = form(" Ana@Example.com", "segredo", "segredo", " Ana Souza ")
            .validate()
            .unwrap();
        assert_eq!(request.email.as_str(), "ana@example.com");
        assert_eq!(request.data.full_name, "Ana Souza");
        assert_eq!(request.password, "segredo");
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            form("a@b.com", "segredo", "segredo", "  ").validate().unwrap_err(),
            MSG_MISSING_FIELDS
        );
        assert_eq!(
            SignupForm::default().validate().unwrap_err(),
            MSG_MISSING_FIELDS
        );
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            form("a@b.com", "12345", "12345", "Ana").validate().unwrap_err(),
            MSG_SHORT_PASSWORD
        );
        assert_eq!(
            form("a@b.com", "123456", "654321", "Ana").validate().unwrap_err(),
            MSG_PASSWORD_MISMATCH
        );
    }

    #[test]
    fn test_invalid_email() {
        assert_eq!(
            form("not-an-email", "123456", "123456", "Ana").validate().unwrap_err(),
            MSG_INVALID_EMAIL
        );
    }

    #[test]
    fn test_camel_case_aliases() {
        let form: SignupForm = serde_json::from_str(
            r#"{"email":"a@b.com","password":"123456","confirmPassword":"123456","fullName":"Ana"}"#,
        )
        .unwrap();
        assert!(form.validate().is_ok());
    }
}
