//! Identity service (GoTrue) API types.

use bookvision_core::{Email, RoleSet, UserId};
use serde::{Deserialize, Serialize};

/// A user record as returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdentityUser {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl IdentityUser {
    /// The user's email, if it parses.
    #[must_use]
    pub fn email_address(&self) -> Option<Email> {
        Email::parse(&self.email).ok()
    }

    /// The user's roles.
    #[must_use]
    pub const fn roles(&self) -> &RoleSet {
        &self.app_metadata.roles
    }

    /// Whether the user holds the subscriber role.
    #[must_use]
    pub fn is_subscriber(&self) -> bool {
        self.app_metadata.roles.is_subscriber()
    }

    /// The `full_name` the user signed up with, if any.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Server-controlled metadata.
///
/// Only `roles` is read here; other keys (`provider`, ...) are carried
/// through untouched so echoing the metadata back does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub roles: RoleSet,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppMetadata {
    /// The same metadata with `roles` replaced.
    #[must_use]
    pub fn with_roles(&self, roles: RoleSet) -> Self {
        Self {
            roles,
            extra: self.extra.clone(),
        }
    }
}

/// User-controlled metadata captured at signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// `GET /admin/users` answers either with a bare array or wrapped in
/// `{ "users": [...] }` depending on the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UserListResponse {
    Bare(Vec<IdentityUser>),
    Wrapped {
        #[serde(default)]
        users: Vec<IdentityUser>,
    },
}

impl UserListResponse {
    pub(crate) fn into_users(self) -> Vec<IdentityUser> {
        match self {
            Self::Bare(users) | Self::Wrapped { users } => users,
        }
    }
}

/// Body of `PUT /admin/users/{id}` when changing roles.
#[derive(Debug, Serialize)]
pub(crate) struct UpdateRolesRequest<'a> {
    pub app_metadata: RolesPatch<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RolesPatch<'a> {
    pub roles: &'a RoleSet,
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: Email,
    pub password: String,
    pub data: SignupData,
}

/// Metadata attached to a new account.
#[derive(Debug, Clone, Serialize)]
pub struct SignupData {
    pub full_name: String,
}

/// Error body returned by the identity service.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.msg.or(self.error_description).or(self.message)
    }
}

/// An event webhook sent by the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    pub event: IdentityEventKind,
    pub user: IdentityUser,
    #[serde(default)]
    pub instance_id: Option<String>,
}

/// Identity event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityEventKind {
    Signup,
    Validate,
    Login,
    #[serde(other)]
    Other,
}

impl IdentityEventKind {
    /// Whether the event creates or confirms an account, the two points at
    /// which roles are assigned.
    #[must_use]
    pub const fn assigns_roles(self) -> bool {
        matches!(self, Self::Signup | Self::Validate)
    }
}

/// Response to an identity event webhook; the identity service stores the
/// returned `app_metadata` on the user.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityEventResponse {
    pub app_metadata: AppMetadata,
}
