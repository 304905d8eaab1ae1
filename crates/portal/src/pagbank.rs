//! PagBank notification payloads.
//!
//! PagBank has posted two shapes over time: order notifications with a
//! `charges` array and a `customer`, and older transaction notifications
//! with a top-level `status` and a `sender`. Both are read here.

use bookvision_core::PagBankStatus;
use serde::Deserialize;

/// A PagBank payment notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub customer: Option<Party>,
    #[serde(default)]
    pub sender: Option<Party>,
}

/// A charge on an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub status: Option<String>,
}

/// The paying customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub email: Option<String>,
}

impl Notification {
    /// Status of the first charge, falling back to the top-level status.
    #[must_use]
    pub fn status(&self) -> Option<PagBankStatus> {
        self.charges
            .first()
            .and_then(|charge| charge.status.as_deref())
            .or(self.status.as_deref())
            .filter(|status| !status.trim().is_empty())
            .map(PagBankStatus::parse)
    }

    /// Customer email, falling back to the sender email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        fn email(party: &Option<Party>) -> Option<&str> {
            party
                .as_ref()
                .and_then(|p| p.email.as_deref())
                .filter(|e| !e.trim().is_empty())
        }
        email(&self.customer).or_else(|| email(&self.sender))
    }
}
