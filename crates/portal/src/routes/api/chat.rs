//! Live-room chat.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use bookvision_core::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireSubscriber;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    /// Only return messages newer than this many ms since the epoch.
    pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessages {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    #[serde(default)]
    pub text: String,
}

/// `GET /api/chat?since=<ms>`
#[instrument(skip_all, fields(since = ?query.since))]
pub async fn index(
    State(state): State<AppState>,
    RequireSubscriber(_user): RequireSubscriber,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ChatMessages>> {
    let messages = state.chat().messages(query.since).await?;
    Ok(Json(ChatMessages { messages }))
}

/// `POST /api/chat`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Json(body): Json<PostMessage>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    let message = state.chat().post(user.display_name, &body.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
