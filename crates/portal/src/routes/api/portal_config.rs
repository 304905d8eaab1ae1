//! `GET /api/portal-config`: what the browser needs before signing in.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Chat poll interval advertised to clients.
pub const CHAT_POLL_MS: u64 = 3_000;
/// Live video poll interval advertised to clients.
pub const LIVE_POLL_MS: u64 = 10_000;

#[derive(Debug, Serialize)]
pub struct PortalConfigResponse {
    pub identity_url: String,
    pub chat_poll_ms: u64,
    pub live_poll_ms: u64,
}

pub async fn show(State(state): State<AppState>) -> Json<PortalConfigResponse> {
    Json(PortalConfigResponse {
        identity_url: state.identity().base_url().to_string(),
        chat_poll_ms: CHAT_POLL_MS,
        live_poll_ms: LIVE_POLL_MS,
    })
}
