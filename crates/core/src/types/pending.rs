//! Payments that arrived before the customer created an account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;

/// A payment recorded for an email that has no identity user yet.
///
/// Written by a payment webhook, consumed and deleted when the same email
/// completes signup. There is no expiry. Timestamps are milliseconds since
/// the Unix epoch, matching what the browser-era records used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub email: Email,
    pub status: String,
    pub timestamp: i64,
    pub paid: bool,
}

impl PendingPayment {
    /// A paid pending record stamped at `now`.
    #[must_use]
    pub fn paid(email: Email, status: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            email,
            status: status.into(),
            timestamp: now.timestamp_millis(),
            paid: true,
        }
    }

    /// When the payment was recorded, if the timestamp is representable.
    #[must_use]
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
