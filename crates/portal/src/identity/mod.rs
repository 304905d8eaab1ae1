//! Identity service client.
//!
//! The site uses Netlify Identity (GoTrue) for accounts. The portal talks to
//! it in two capacities:
//!
//! - **Admin**: find users by email and rewrite their `app_metadata.roles`,
//!   authenticated with the admin token
//! - **User**: resolve a browser's bearer token to its user record, and
//!   forward validated signups
//!
//! # API Reference
//!
//! - `GET  {identity}/admin/users?email=` - user lookup
//! - `PUT  {identity}/admin/users/{id}` - `{ "app_metadata": { "roles": [...] } }`
//! - `GET  {identity}/user` - current user for a bearer token
//! - `POST {identity}/signup` - `{ email, password, data }`

mod types;

pub use types::*;

use std::sync::Arc;

use bookvision_core::{Email, RoleSet, UserId};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;

/// Errors that can occur when calling the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The token was rejected.
    #[error("Unauthorized: identity token rejected")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Identity service API client.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                config: config.clone(),
            }),
        })
    }

    /// The identity service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.config.url.as_str()
    }

    fn admin_token(&self) -> &SecretString {
        &self.inner.config.admin_token
    }

    /// Find the user registered under `email`.
    ///
    /// The admin API filters loosely, so results are matched again here by
    /// case-insensitive email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the request fails or the response cannot be
    /// parsed.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let url = format!(
            "{}?email={}",
            self.inner.config.endpoint("admin/users"),
            urlencoding::encode(email.as_str())
        );

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(self.admin_token().expose_secret())
            .send()
            .await?;
        let users: UserListResponse = handle_response(response).await?;

        Ok(users
            .into_users()
            .into_iter()
            .find(|user| email.matches(&user.email)))
    }

    /// Replace a user's role list.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the update is rejected.
    #[instrument(skip(self, roles), fields(user_id = %user_id, roles = ?roles.as_slice()))]
    pub async fn update_roles(
        &self,
        user_id: &UserId,
        roles: &RoleSet,
    ) -> Result<IdentityUser, IdentityError> {
        let url = self.inner.config.endpoint(&format!(
            "admin/users/{}",
            urlencoding::encode(user_id.as_str())
        ));
        let body = UpdateRolesRequest {
            app_metadata: RolesPatch { roles },
        };

        let response = self
            .inner
            .client
            .put(&url)
            .bearer_auth(self.admin_token().expose_secret())
            .json(&body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Resolve a browser's bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the token is invalid or
    /// expired.
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.inner.config.endpoint("user"))
            .bearer_auth(token)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` with the service's message if the signup
    /// is refused (e.g. the email is already registered).
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.inner.config.endpoint("signup"))
            .json(request)
            .send()
            .await?;
        handle_response(response).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(format!("Failed to parse response: {e}")));
    }

    Err(parse_error(response).await)
}

async fn parse_error(response: reqwest::Response) -> IdentityError {
    let status = response.status().as_u16();

    if status == 401 {
        return IdentityError::Unauthorized;
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(text);

    IdentityError::Api { status, message }
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}
