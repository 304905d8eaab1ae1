//! Current live video.

use axum::{Json, extract::State, http::StatusCode};
use bookvision_core::LiveVideoId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireSubscriber};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub video_id: Option<LiveVideoId>,
}

#[derive(Debug, Deserialize)]
pub struct SetLive {
    /// Bare id or YouTube URL; blank clears.
    #[serde(default)]
    pub video_id: Option<String>,
}

/// `GET /api/live`
pub async fn show(
    State(state): State<AppState>,
    RequireSubscriber(_user): RequireSubscriber,
) -> Result<Json<LiveResponse>> {
    let video_id = state.live().current().await?;
    Ok(Json(LiveResponse { video_id }))
}

/// `PUT /api/live`
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<SetLive>,
) -> Result<Json<LiveResponse>> {
    let video_id = LiveVideoId::parse(body.video_id.as_deref().unwrap_or_default())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.live().set(video_id.as_ref()).await?;
    Ok(Json(LiveResponse { video_id }))
}

/// `DELETE /api/live`
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<StatusCode> {
    state.live().set(None).await?;
    Ok(StatusCode::NO_CONTENT)
}
