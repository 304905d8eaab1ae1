//! Personal trade journal.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bookvision_core::{DailyStats, NewTrade, Trade, TradeId};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireSubscriber;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TradeList {
    pub trades: Vec<Trade>,
}

/// `GET /api/trades`
pub async fn index(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
) -> Result<Json<TradeList>> {
    let trades = state.journal().trades(&user.id).await?;
    Ok(Json(TradeList { trades }))
}

/// `POST /api/trades`
#[instrument(skip_all, fields(user_id = %user.id, asset = %input.asset))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Json(input): Json<NewTrade>,
) -> Result<(StatusCode, Json<Trade>)> {
    let trade = state.journal().add(&user.id, input).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

/// `DELETE /api/trades/{id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.journal().remove(&user.id, &TradeId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Trade".to_string()))
    }
}

/// `GET /api/trades/stats`
pub async fn stats(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
) -> Result<Json<DailyStats>> {
    let stats = state.journal().stats(&user.id, Utc::now()).await?;
    Ok(Json(stats))
}
