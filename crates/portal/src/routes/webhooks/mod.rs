//! Payment and identity webhooks.
//!
//! Status policy: a missing or invalid signature is answered with 400 and
//! nothing else happens. Once a request is authenticated the answer is
//! always 200, whatever the outcome, so providers do not retry; failures are
//! logged and reported to Sentry instead.

pub mod identity;
pub mod pagbank;
pub mod stripe;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::services::ReconcileOutcome;

/// Body returned to payment providers.
#[derive(Debug, Serialize)]
pub struct WebhookReceipt {
    pub received: bool,
    pub outcome: ReconcileOutcome,
}

impl WebhookReceipt {
    #[must_use]
    pub const fn new(outcome: ReconcileOutcome) -> Self {
        Self {
            received: true,
            outcome,
        }
    }
}

impl IntoResponse for WebhookReceipt {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// 400 for a request that failed authentication.
pub(crate) fn rejected(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_body() {
        assert_eq!(
            serde_json::to_value(WebhookReceipt::new(ReconcileOutcome::PendingRecorded)).unwrap(),
            json!({"received": true, "outcome": "pending_recorded"})
        );
    }
}
