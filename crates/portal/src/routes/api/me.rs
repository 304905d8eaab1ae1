//! `GET /api/me`

use axum::Json;
use bookvision_core::{Email, UserId};
use serde::Serialize;

use crate::middleware::RequireMember;

/// The caller's profile as the portal sees it.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: UserId,
    pub email: Option<String>,
    pub name: String,
    pub roles: Vec<String>,
    pub subscriber: bool,
    pub admin: bool,
}

/// Return the authenticated user.
pub async fn show(RequireMember(user): RequireMember) -> Json<MeResponse> {
    Json(MeResponse {
        email: user.email.as_ref().map(Email::as_str).map(String::from),
        roles: user.user.roles().as_slice().to_vec(),
        subscriber: user.is_subscriber,
        admin: user.is_admin,
        name: user.display_name,
        id: user.id,
    })
}
