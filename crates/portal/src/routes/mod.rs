//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (blob store reachable)
//!
//! # Webhooks (signature checked, rate limited)
//! POST   /webhooks/stripe        - Stripe subscription and checkout events
//! POST   /webhooks/pagbank       - PagBank payment notifications
//! POST   /webhooks/identity      - Identity signup/validate events
//!
//! # Public API
//! GET    /api/portal-config      - Identity URL and poll intervals
//! POST   /api/signup             - Create an account
//!
//! # Member API (bearer token)
//! GET    /api/me                 - Current user
//!
//! # Subscriber API (bearer token + Assinante)
//! GET    /api/chat?since=        - Chat messages
//! POST   /api/chat               - Post a message
//! GET    /api/live               - Current live video id
//! PUT    /api/live               - Set live video (admin)
//! DELETE /api/live               - Clear live video (admin)
//! GET    /api/trades             - Own trades
//! POST   /api/trades             - Record a trade
//! GET    /api/trades/stats       - Today's results
//! DELETE /api/trades/{id}        - Delete a trade
//! GET    /api/storage?prefix=    - List keys
//! GET    /api/storage/{key}      - Read a value
//! PUT    /api/storage/{key}      - Write a value
//! ```

pub mod api;
pub mod webhooks;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::middleware::{ClientIpKeyExtractor, webhook_rate_limiter, write_rate_limiter};
use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: the blob store answers.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.store().backend();
    match state.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "storage": backend })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "storage": backend })),
            )
        }
    }
}

/// Create the webhook routes router.
pub fn webhook_routes(key: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/stripe", post(webhooks::stripe::stripe_webhook))
        .route("/pagbank", post(webhooks::pagbank::pagbank_webhook))
        .route("/identity", post(webhooks::identity::identity_webhook))
        .route_layer(webhook_rate_limiter(key))
}

/// Create the API routes router.
pub fn api_routes(key: ClientIpKeyExtractor) -> Router<AppState> {
    let writes = write_rate_limiter(key);

    Router::new()
        .route("/portal-config", get(api::portal_config::show))
        .route("/signup", post(api::signup::create).layer(writes.clone()))
        .route("/me", get(api::me::show))
        .route(
            "/chat",
            get(api::chat::index).merge(post(api::chat::create).layer(writes.clone())),
        )
        .route(
            "/live",
            get(api::live::show).put(api::live::update).delete(api::live::clear),
        )
        .route(
            "/trades",
            get(api::trades::index).merge(post(api::trades::create).layer(writes.clone())),
        )
        .route("/trades/stats", get(api::trades::stats))
        .route(
            "/trades/{id}",
            axum::routing::delete(api::trades::destroy),
        )
        .route("/storage", get(api::storage::index))
        .route(
            "/storage/{key}",
            get(api::storage::show).merge(put(api::storage::update).layer(writes)),
        )
}

/// Create all routes for the portal, rate limited by `key`.
pub fn routes(key: &ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/webhooks", webhook_routes(key.clone()))
        .nest("/api", api_routes(key.clone()))
}
