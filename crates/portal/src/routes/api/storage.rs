//! Generic key/value storage for portal pages.
//!
//! `shared` defaults to `true`. Private keys live under the caller's own
//! namespace. Keys backing the chat, the live video and the trade journal
//! can only be written through their own endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireSubscriber;
use crate::state::AppState;
use crate::storage::Scope;

const fn default_shared() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    #[serde(default = "default_shared")]
    pub shared: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_shared")]
    pub shared: bool,
}

#[derive(Debug, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub shared: bool,
}

#[derive(Debug, Serialize)]
pub struct KeyList {
    pub keys: Vec<String>,
    pub prefix: String,
    pub shared: bool,
}

/// `GET /api/storage/{key}?shared=bool`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Path(key): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Entry>> {
    let scope = Scope::for_request(query.shared, &user.id);
    let value = state
        .store()
        .get(&scope, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Key '{key}'")))?;

    Ok(Json(Entry {
        key,
        value,
        shared: query.shared,
    }))
}

/// `PUT /api/storage/{key}?shared=bool`; the body is stored as-is.
#[instrument(skip(state, user, value), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Path(key): Path<String>,
    Query(query): Query<ScopeQuery>,
    value: String,
) -> Result<Json<Entry>> {
    let scope = Scope::for_request(query.shared, &user.id);
    if scope.is_reserved(&key) {
        return Err(AppError::Forbidden(format!(
            "A chave '{key}' só pode ser alterada pela sua própria rota"
        )));
    }

    state.store().set(&scope, &key, &value).await?;
    Ok(Json(Entry {
        key,
        value,
        shared: query.shared,
    }))
}

/// `GET /api/storage?prefix=&shared=bool`
pub async fn index(
    State(state): State<AppState>,
    RequireSubscriber(user): RequireSubscriber,
    Query(query): Query<ListQuery>,
) -> Result<Json<KeyList>> {
    let scope = Scope::for_request(query.shared, &user.id);
    let keys = state.store().list(&scope, &query.prefix).await?;
    Ok(Json(KeyList {
        keys,
        prefix: query.prefix,
        shared: query.shared,
    }))
}
