//! Stripe API client.
//!
//! Used for two things: resolving a webhook's customer id to an email when
//! the event carries none, and checking whether a newly signed-up email
//! already has an active subscription.
//!
//! # API Reference
//!
//! - Base URL: `https://api.stripe.com` (overridable via `STRIPE_API_BASE`)
//! - Authentication: `Authorization: Bearer <secret key>`

mod types;

pub use types::*;

use std::sync::Arc;

use bookvision_core::Email;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::StripeConfig;

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let url = format!("{}{path}", self.inner.api_base);
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StripeError::Parse(format!("Failed to parse response: {e}")));
        }

        if status.as_u16() == 404 {
            return Err(StripeError::NotFound(path.to_string()));
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Retrieve a customer by id.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the request fails.
    #[instrument(skip(self))]
    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, StripeError> {
        self.get(&format!(
            "/v1/customers/{}",
            urlencoding::encode(customer_id)
        ))
        .await
    }

    /// The first customer registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, StripeError> {
        let customers: List<Customer> = self
            .get(&format!(
                "/v1/customers?email={}&limit=1",
                urlencoding::encode(email.as_str())
            ))
            .await?;
        Ok(customers.data.into_iter().next())
    }

    /// Whether the customer has at least one active subscription.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the request fails.
    #[instrument(skip(self))]
    pub async fn has_active_subscription(&self, customer_id: &str) -> Result<bool, StripeError> {
        let subscriptions: List<Subscription> = self
            .get(&format!(
                "/v1/subscriptions?customer={}&status=active&limit=1",
                urlencoding::encode(customer_id)
            ))
            .await?;
        Ok(!subscriptions.data.is_empty())
    }

    /// Whether `email` belongs to a customer with an active subscription.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if either lookup fails.
    pub async fn email_has_active_subscription(&self, email: &Email) -> Result<bool, StripeError> {
        match self.find_customer_by_email(email).await? {
            Some(customer) => self.has_active_subscription(&customer.id).await,
            None => Ok(false),
        }
    }

    /// Find the email that pays for an event.
    ///
    /// Uses the email on the object, falling back to fetching the customer.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the customer lookup fails.
    pub async fn resolve_event_email(
        &self,
        object: &EventObject,
    ) -> Result<Option<String>, StripeError> {
        if let Some(email) = object.inline_email() {
            return Ok(Some(email.to_string()));
        }

        match &object.customer {
            Some(customer) => {
                let customer = self.retrieve_customer(customer.id()).await?;
                Ok(customer.email.filter(|_| !customer.deleted))
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}
