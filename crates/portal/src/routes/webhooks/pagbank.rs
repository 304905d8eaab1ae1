//! `POST /webhooks/pagbank`

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bookvision_core::EntitlementChange;
use tracing::instrument;

use super::{WebhookReceipt, rejected};
use crate::pagbank::Notification;
use crate::services::ReconcileOutcome;
use crate::signature::verify_pagbank;
use crate::state::AppState;

const AUTHENTICITY_HEADER: &str = "x-authenticity-token";

/// Handle a PagBank payment notification.
#[instrument(skip_all, fields(status))]
pub async fn pagbank_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = String::from_utf8_lossy(&body);

    if let Some(token) = &state.config().pagbank.token {
        let Some(header) = headers.get(AUTHENTICITY_HEADER).and_then(|v| v.to_str().ok()) else {
            tracing::warn!("PagBank notification without authenticity token");
            return rejected("missing authenticity token");
        };
        if let Err(e) = verify_pagbank(token, header, &payload) {
            tracing::warn!(error = %e, "Rejected PagBank notification");
            return rejected("invalid authenticity token");
        }
    }

    let notification = match serde_json::from_str::<Notification>(&payload) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::error!(error = %e, "Unparseable PagBank notification");
            return WebhookReceipt::new(ReconcileOutcome::Failed).into_response();
        }
    };

    let Some(status) = notification.status() else {
        return WebhookReceipt::new(ReconcileOutcome::Ignored).into_response();
    };
    tracing::Span::current().record("status", status.as_str());

    let change = status.change();
    if change == EntitlementChange::NoChange {
        return WebhookReceipt::new(ReconcileOutcome::Ignored).into_response();
    }

    let outcome = state
        .entitlements()
        .reconcile(notification.email(), change, status.as_str())
        .await;

    tracing::info!(outcome = outcome.as_str(), "PagBank notification processed");
    WebhookReceipt::new(outcome).into_response()
}
