//! `POST /webhooks/identity`
//!
//! The identity service calls this on `signup` and `validate` and stores the
//! `app_metadata` in the response on the new user. A user who paid before
//! signing up, or who already has an active Stripe subscription, gets the
//! subscriber role here. Everything else answers with the user's roles
//! unchanged.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use super::rejected;
use crate::identity::{IdentityEvent, IdentityEventResponse};
use crate::signature::verify_identity;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Handle an identity event.
#[instrument(skip_all, fields(event, user_id))]
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = String::from_utf8_lossy(&body);

    if let Some(secret) = &state.config().identity.webhook_secret {
        let Some(token) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
            tracing::warn!("Identity webhook without signature");
            return rejected("missing signature");
        };
        if let Err(e) = verify_identity(secret, token, &payload, Utc::now().timestamp()) {
            tracing::warn!(error = %e, "Rejected identity webhook");
            return rejected("invalid signature");
        }
    }

    let event = match serde_json::from_str::<IdentityEvent>(&payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Unparseable identity event");
            return (StatusCode::OK, Json(json!({}))).into_response();
        }
    };

    let span = tracing::Span::current();
    span.record("event", tracing::field::debug(event.event));
    span.record("user_id", event.user.id.as_str());

    let metadata = &event.user.app_metadata;
    let unchanged = || Json(IdentityEventResponse { app_metadata: metadata.clone() }).into_response();

    if !event.event.assigns_roles() {
        return unchanged();
    }
    let Some(email) = event.user.email_address() else {
        tracing::warn!("Identity event without a usable email");
        return unchanged();
    };

    match state.entitlements().resolve_signup(&email).await {
        Ok(entitlement) if entitlement.is_entitled() => {
            let roles = metadata
                .roles
                .with_subscriber()
                .unwrap_or_else(|| metadata.roles.clone());
            tracing::info!(?entitlement, "Assigning subscriber role at signup");
            Json(IdentityEventResponse {
                app_metadata: metadata.with_roles(roles),
            })
            .into_response()
        }
        Ok(_) => unchanged(),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to resolve signup entitlement");
            unchanged()
        }
    }
}
