//! Payment status values and the entitlement change they imply.

use serde::{Deserialize, Serialize};

/// What a payment event means for the subscriber role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementChange {
    /// The customer paid; grant the subscriber role.
    Grant,
    /// The payment was reversed or the subscription ended; revoke it.
    Revoke,
    /// Informational status; leave roles alone.
    NoChange,
}

/// PagBank charge/order status.
///
/// PagBank sends upper-case statuses but older integrations posted lower
/// case, so parsing ignores case. Unknown statuses are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagBankStatus {
    Paid,
    Approved,
    Canceled,
    Refunded,
    Other(String),
}

impl PagBankStatus {
    /// Parse a raw status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "APPROVED" => Self::Approved,
            "CANCELED" => Self::Canceled,
            "REFUNDED" => Self::Refunded,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    /// The entitlement change this status implies.
    #[must_use]
    pub const fn change(&self) -> EntitlementChange {
        match self {
            Self::Paid | Self::Approved => EntitlementChange::Grant,
            Self::Canceled | Self::Refunded => EntitlementChange::Revoke,
            Self::Other(_) => EntitlementChange::NoChange,
        }
    }

    /// The status as PagBank spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "PAID",
            Self::Approved => "APPROVED",
            Self::Canceled => "CANCELED",
            Self::Refunded => "REFUNDED",
            Self::Other(raw) => raw,
        }
    }
}

/// Stripe subscription status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Incomplete,
    IncompleteExpired,
    Canceled,
    Unpaid,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// The entitlement change a subscription in this status implies.
    ///
    /// `past_due`, `incomplete` and `paused` are transitional: Stripe is
    /// still retrying or waiting on the customer, so roles stay as they are.
    #[must_use]
    pub const fn change(&self) -> EntitlementChange {
        match self {
            Self::Active | Self::Trialing => EntitlementChange::Grant,
            Self::Canceled | Self::Unpaid | Self::IncompleteExpired => EntitlementChange::Revoke,
            Self::PastDue | Self::Incomplete | Self::Paused | Self::Unknown => {
                EntitlementChange::NoChange
            }
        }
    }
}
