//! Bearer-token authentication extractors.
//!
//! The browser sends the identity service JWT as `Authorization: Bearer`.
//! The token is resolved to its user through the identity service and the
//! result cached for a minute, so polling clients do not hit the identity
//! service on every request.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireSubscriber(user): RequireSubscriber) -> impl IntoResponse {
//!     format!("Olá, {}!", user.display_name)
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use bookvision_core::{Email, UserId, author_name};
use sha2::{Digest, Sha256};

use crate::error::{AppError, set_sentry_user};
use crate::identity::IdentityUser;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<Email>,
    /// Name shown in chat.
    pub display_name: String,
    pub user: IdentityUser,
    pub is_subscriber: bool,
    pub is_admin: bool,
}

impl CurrentUser {
    fn new(user: IdentityUser, state: &AppState) -> Self {
        let email = user.email_address();
        Self {
            id: user.id.clone(),
            display_name: author_name(user.full_name(), email.as_ref()),
            is_subscriber: user.is_subscriber(),
            is_admin: state.config().is_admin(email.as_ref()),
            email,
            user,
        }
    }
}

/// Any signed-in user.
pub struct RequireMember(pub CurrentUser);

/// A signed-in user holding the subscriber role.
pub struct RequireSubscriber(pub CurrentUser);

/// The configured live-room admin.
pub struct RequireAdmin(pub CurrentUser);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, AppError> {
    let token = bearer_token(parts)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
    let cache_key = hex::encode(Sha256::digest(token.as_bytes()));

    let user = if let Some(user) = state.user_cache().get(&cache_key).await {
        user
    } else {
        let user = state.identity().current_user(token).await?;
        state.user_cache().insert(cache_key, user.clone()).await;
        user
    };

    let current = CurrentUser::new(user, state);
    set_sentry_user(&current.id, current.email.as_ref().map(Email::as_str));
    tracing::Span::current().record("user_id", current.id.as_str());
    Ok(current)
}

impl FromRequestParts<AppState> for RequireMember {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireSubscriber {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_subscriber {
            return Err(AppError::Forbidden(
                "Assinatura necessária para acessar este conteúdo".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("Apenas o administrador".to_string()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
