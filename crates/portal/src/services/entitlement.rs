//! Payment-to-role reconciliation.
//!
//! A payment event names an email and implies a grant or a revoke of the
//! subscriber role. This service applies that to the identity directory:
//!
//! - **grant**: user found → add `Assinante` (one PUT, skipped if already
//!   present); user missing → record a pending payment for signup to consume
//! - **revoke**: user found → remove `Assinante`, keeping other roles; user
//!   missing → drop any pending payment
//!
//! Duplicate events are harmless: they re-apply the same assignment.

use bookvision_core::{Email, EntitlementChange, PendingPayment};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use super::pending::PendingPayments;
use crate::identity::{IdentityClient, IdentityError};
use crate::storage::StorageError;
use crate::stripe::{StripeClient, StripeError};

/// Errors reconciling an entitlement.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("stripe error: {0}")]
    Stripe(#[from] StripeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What a webhook did, reported back in its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The subscriber role was added.
    Granted,
    /// The subscriber role was removed.
    Revoked,
    /// The user already had the requested entitlement.
    AlreadyCurrent,
    /// No user yet; a pending payment was stored for signup.
    PendingRecorded,
    /// Revoke for an email with no user.
    UserNotFound,
    /// The event does not affect roles.
    Ignored,
    /// The event carried no usable email.
    NoEmail,
    /// Lookup or update failed; logged and dropped.
    Failed,
}

impl ReconcileOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Revoked => "revoked",
            Self::AlreadyCurrent => "already_current",
            Self::PendingRecorded => "pending_recorded",
            Self::UserNotFound => "user_not_found",
            Self::Ignored => "ignored",
            Self::NoEmail => "no_email",
            Self::Failed => "failed",
        }
    }
}

/// Why a new account is entitled to the subscriber role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupEntitlement {
    /// A payment arrived before the account existed.
    PendingPayment,
    /// Stripe reports an active subscription for the email.
    ActiveSubscription,
    /// Not entitled.
    None,
}

impl SignupEntitlement {
    #[must_use]
    pub const fn is_entitled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Applies payment events to identity roles.
#[derive(Clone)]
pub struct EntitlementService {
    identity: IdentityClient,
    stripe: Option<StripeClient>,
    pending: PendingPayments,
}

impl EntitlementService {
    #[must_use]
    pub const fn new(
        identity: IdentityClient,
        stripe: Option<StripeClient>,
        pending: PendingPayments,
    ) -> Self {
        Self {
            identity,
            stripe,
            pending,
        }
    }

    /// Pending-payment records.
    #[must_use]
    pub const fn pending(&self) -> &PendingPayments {
        &self.pending
    }

    /// Grant the subscriber role to the user registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementError` if the lookup, update, or pending write
    /// fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn grant(
        &self,
        email: &Email,
        status: &str,
    ) -> Result<ReconcileOutcome, EntitlementError> {
        let Some(user) = self.identity.find_user_by_email(email).await? else {
            self.pending
                .record(&PendingPayment::paid(email.clone(), status, Utc::now()))
                .await?;
            tracing::info!("No identity user yet, recorded pending payment");
            return Ok(ReconcileOutcome::PendingRecorded);
        };

        let Some(roles) = user.roles().with_subscriber() else {
            return Ok(ReconcileOutcome::AlreadyCurrent);
        };

        self.identity.update_roles(&user.id, &roles).await?;
        tracing::info!(user_id = %user.id, "Granted subscriber role");
        Ok(ReconcileOutcome::Granted)
    }

    /// Remove the subscriber role from the user registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementError` if the lookup, update, or pending delete
    /// fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn revoke(
        &self,
        email: &Email,
        status: &str,
    ) -> Result<ReconcileOutcome, EntitlementError> {
        let Some(user) = self.identity.find_user_by_email(email).await? else {
            if self.pending.remove(email).await? {
                tracing::info!(status, "Dropped pending payment for unknown user");
            }
            return Ok(ReconcileOutcome::UserNotFound);
        };

        let Some(roles) = user.roles().without_subscriber() else {
            return Ok(ReconcileOutcome::AlreadyCurrent);
        };

        self.identity.update_roles(&user.id, &roles).await?;
        tracing::info!(user_id = %user.id, status, "Revoked subscriber role");
        Ok(ReconcileOutcome::Revoked)
    }

    /// Apply a webhook's entitlement change, absorbing failures.
    ///
    /// Providers retry on non-2xx, so nothing here is surfaced as an error:
    /// failures are logged, reported to Sentry, and become
    /// [`ReconcileOutcome::Failed`].
    pub async fn reconcile(
        &self,
        raw_email: Option<&str>,
        change: EntitlementChange,
        status: &str,
    ) -> ReconcileOutcome {
        if change == EntitlementChange::NoChange {
            return ReconcileOutcome::Ignored;
        }

        let Some(email) = raw_email.and_then(|raw| Email::parse(raw).ok()) else {
            tracing::warn!(status, "Payment event without a usable email");
            return ReconcileOutcome::NoEmail;
        };

        let result = match change {
            EntitlementChange::Grant => self.grant(&email, status).await,
            EntitlementChange::Revoke => self.revoke(&email, status).await,
            EntitlementChange::NoChange => Ok(ReconcileOutcome::Ignored),
        };

        result.unwrap_or_else(|e| {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                email = %email,
                sentry_event_id = %event_id,
                "Failed to reconcile payment event"
            );
            ReconcileOutcome::Failed
        })
    }

    /// Decide whether a freshly signed-up email is already paid for.
    ///
    /// A pending payment is consumed by this call. Stripe is consulted only
    /// when there is none and Stripe is configured.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementError` if storage or Stripe fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn resolve_signup(&self, email: &Email) -> Result<SignupEntitlement, EntitlementError> {
        if let Some(payment) = self.pending.take(email).await? {
            if payment.paid {
                tracing::info!(status = %payment.status, "Signup matched pending payment");
                return Ok(SignupEntitlement::PendingPayment);
            }
        }

        if let Some(stripe) = &self.stripe {
            if stripe.email_has_active_subscription(email).await? {
                tracing::info!("Signup matched active Stripe subscription");
                return Ok(SignupEntitlement::ActiveSubscription);
            }
        }

        Ok(SignupEntitlement::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_as_snake_case() {
        for outcome in [
            ReconcileOutcome::Granted,
            ReconcileOutcome::AlreadyCurrent,
            ReconcileOutcome::PendingRecorded,
            ReconcileOutcome::NoEmail,
        ] {
            assert_eq!(
                serde_json::to_value(outcome).ok(),
                Some(serde_json::Value::from(outcome.as_str()))
            );
        }
    }

    #[test]
    fn test_signup_entitlement() {
        assert!(SignupEntitlement::PendingPayment.is_entitled());
        assert!(SignupEntitlement::ActiveSubscription.is_entitled());
        assert!(!SignupEntitlement::None.is_entitled());
    }
}
