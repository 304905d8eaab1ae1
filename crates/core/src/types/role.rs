//! Identity roles and the subscriber entitlement.

use serde::{Deserialize, Serialize};

/// The role that gates paid content.
pub const SUBSCRIBER_ROLE: &str = "Assinante";

/// The list of roles stored in a user's `app_metadata.roles`.
///
/// Earlier webhook versions wrote the role in lower case (`assinante`), so
/// the subscriber check is case-insensitive. Granting always writes the
/// canonical [`SUBSCRIBER_ROLE`]; revoking removes every casing of it and
/// leaves unrelated roles untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    /// Create a role set from raw role names.
    #[must_use]
    pub const fn new(roles: Vec<String>) -> Self {
        Self(roles)
    }

    /// A role set holding only the subscriber role.
    #[must_use]
    pub fn subscriber() -> Self {
        Self(vec![SUBSCRIBER_ROLE.to_owned()])
    }

    /// Whether the set contains the subscriber role.
    #[must_use]
    pub fn is_subscriber(&self) -> bool {
        self.0
            .iter()
            .any(|role| role.eq_ignore_ascii_case(SUBSCRIBER_ROLE))
    }

    /// Returns a copy with the subscriber role added.
    ///
    /// Returns `None` when the role is already present.
    #[must_use]
    pub fn with_subscriber(&self) -> Option<Self> {
        if self.is_subscriber() {
            return None;
        }
        let mut roles = self.0.clone();
        roles.push(SUBSCRIBER_ROLE.to_owned());
        Some(Self(roles))
    }

    /// Returns a copy with the subscriber role removed.
    ///
    /// Returns `None` when the role is not present.
    #[must_use]
    pub fn without_subscriber(&self) -> Option<Self> {
        if !self.is_subscriber() {
            return None;
        }
        Some(Self(
            self.0
                .iter()
                .filter(|role| !role.eq_ignore_ascii_case(SUBSCRIBER_ROLE))
                .cloned()
                .collect(),
        ))
    }

    /// Borrow the raw role names.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consume into the raw role names.
    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RoleSet {
    fn from(roles: Vec<String>) -> Self {
        Self(roles)
    }
}
