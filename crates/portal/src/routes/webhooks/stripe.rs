//! `POST /webhooks/stripe`

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bookvision_core::EntitlementChange;
use chrono::Utc;
use tracing::instrument;

use super::{WebhookReceipt, rejected};
use crate::services::ReconcileOutcome;
use crate::signature::verify_stripe;
use crate::state::AppState;
use crate::stripe::Event;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Handle a Stripe event.
///
/// Events are only accepted when Stripe is configured; otherwise the route
/// answers 404 so a misrouted endpoint is visible in the Stripe dashboard.
#[instrument(skip_all, fields(event_id, event_type))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(config), Some(stripe)) = (state.config().stripe.as_ref(), state.stripe()) else {
        tracing::warn!("Stripe webhook received but Stripe is not configured");
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Stripe webhook without signature header");
        return rejected("missing signature");
    };
    let Ok(payload) = std::str::from_utf8(&body) else {
        return rejected("body is not UTF-8");
    };
    if let Err(e) = verify_stripe(&config.webhook_secret, signature, payload, Utc::now().timestamp())
    {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        return rejected("invalid signature");
    }

    let event = match serde_json::from_str::<Event>(payload).map(Event::into_handled) {
        Ok(Ok(Some(event))) => event,
        Ok(Ok(None)) => return WebhookReceipt::new(ReconcileOutcome::Ignored).into_response(),
        Ok(Err(e)) | Err(e) => {
            tracing::error!(error = %e, "Unparseable Stripe event");
            return WebhookReceipt::new(ReconcileOutcome::Failed).into_response();
        }
    };

    let span = tracing::Span::current();
    span.record("event_id", event.id.as_str());
    span.record("event_type", event.event_type.as_str());

    let change = event.entitlement_change();
    if change == EntitlementChange::NoChange {
        return WebhookReceipt::new(ReconcileOutcome::Ignored).into_response();
    }

    let email = match stripe.resolve_event_email(&event.object).await {
        Ok(email) => email,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to resolve customer email");
            return WebhookReceipt::new(ReconcileOutcome::Failed).into_response();
        }
    };

    let outcome = state
        .entitlements()
        .reconcile(email.as_deref(), change, &event.event_type)
        .await;

    tracing::info!(outcome = outcome.as_str(), "Stripe event processed");
    WebhookReceipt::new(outcome).into_response()
}
