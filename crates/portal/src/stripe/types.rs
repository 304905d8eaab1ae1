//! Stripe API and webhook event types.
//!
//! Only the fields the portal reads are modeled; everything else in the
//! payloads is ignored.

use bookvision_core::{EntitlementChange, SubscriptionStatus};
use serde::Deserialize;

/// A Stripe list response.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A Stripe customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// A Stripe subscription, as listed by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: SubscriptionStatus,
}

/// A webhook event envelope.
///
/// The object is kept as raw JSON until the event type is known to be one
/// the portal handles, so unrelated event shapes never fail to parse.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// The object an event is about.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Union of the checkout session, invoice, and subscription fields used to
/// find the paying customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Subscription status; only meaningful on subscription events.
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
}

/// Reference to a customer: an id (`cus_...`), or the customer object when
/// the field was expanded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Id(String),
    Expanded { id: String },
}

impl CustomerRef {
    /// The customer id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Expanded { id } => id,
        }
    }
}

/// Customer details collected at checkout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl EventObject {
    /// Email carried on the object itself: `customer_email`, then
    /// `customer_details.email`.
    #[must_use]
    pub fn inline_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| {
                self.customer_details
                    .as_ref()
                    .and_then(|d| d.email.as_deref())
            })
            .filter(|email| !email.trim().is_empty())
    }
}

/// Event types that affect the subscriber role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted,
    InvoicePaid,
    InvoicePaymentFailed,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
}

impl EventKind {
    /// Classify a raw event type; `None` for events the portal ignores.
    #[must_use]
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "checkout.session.completed" => Some(Self::CheckoutCompleted),
            "invoice.payment_succeeded" => Some(Self::InvoicePaid),
            "invoice.payment_failed" => Some(Self::InvoicePaymentFailed),
            "customer.subscription.created" => Some(Self::SubscriptionCreated),
            "customer.subscription.updated" => Some(Self::SubscriptionUpdated),
            "customer.subscription.deleted" => Some(Self::SubscriptionDeleted),
            _ => None,
        }
    }
}

/// An event the portal acts on, with its object parsed.
#[derive(Debug, Clone)]
pub struct HandledEvent {
    pub id: String,
    pub kind: EventKind,
    pub event_type: String,
    pub object: EventObject,
}

impl Event {
    /// Parse the object of a handled event; `Ok(None)` for ignored types.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if a handled event's object is malformed.
    pub fn into_handled(self) -> Result<Option<HandledEvent>, serde_json::Error> {
        let Some(kind) = EventKind::parse(&self.event_type) else {
            return Ok(None);
        };
        let object = serde_json::from_value(self.data.object)?;

        Ok(Some(HandledEvent {
            id: self.id,
            kind,
            event_type: self.event_type,
            object,
        }))
    }
}

impl HandledEvent {
    /// What this event means for the customer's subscriber role.
    #[must_use]
    pub fn entitlement_change(&self) -> EntitlementChange {
        match self.kind {
            EventKind::CheckoutCompleted | EventKind::InvoicePaid => EntitlementChange::Grant,
            EventKind::SubscriptionCreated | EventKind::SubscriptionUpdated => self
                .object
                .status
                .as_ref()
                .map_or(EntitlementChange::NoChange, SubscriptionStatus::change),
            EventKind::SubscriptionDeleted | EventKind::InvoicePaymentFailed => {
                EntitlementChange::Revoke
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(event_type: &str, object: serde_json::Value) -> Event {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": {"object": object},
        }))
        .unwrap()
    }

    fn event(event_type: &str, object: serde_json::Value) -> HandledEvent {
        parse(event_type, object).into_handled().unwrap().unwrap()
    }

    #[test]
    fn test_payment_events_grant() {
        let e = event("checkout.session.completed", json!({"customer_email": "a@b.com"}));
        assert_eq!(e.entitlement_change(), EntitlementChange::Grant);

        let e = event("invoice.payment_succeeded", json!({"status": "paid"}));
        assert_eq!(e.entitlement_change(), EntitlementChange::Grant);
    }

    #[test]
    fn test_subscription_events_follow_status() {
        for (status, expected) in [
            ("active", EntitlementChange::Grant),
            ("trialing", EntitlementChange::Grant),
            ("canceled", EntitlementChange::Revoke),
            ("unpaid", EntitlementChange::Revoke),
            ("incomplete_expired", EntitlementChange::Revoke),
            ("past_due", EntitlementChange::NoChange),
        ] {
            let e = event(
                "customer.subscription.updated",
                json!({"id": "sub_1", "customer": "cus_1", "status": status}),
            );
            assert_eq!(e.entitlement_change(), expected, "status {status}");
        }
    }

    #[test]
    fn test_revoking_and_ignored_events() {
        let e = event("customer.subscription.deleted", json!({"status": "canceled"}));
        assert_eq!(e.entitlement_change(), EntitlementChange::Revoke);

        let e = event("invoice.payment_failed", json!({}));
        assert_eq!(e.entitlement_change(), EntitlementChange::Revoke);

        let e = parse("customer.created", json!({"customer_details": 42}));
        assert!(e.into_handled().unwrap().is_none());
    }

    #[test]
    fn test_malformed_handled_object() {
        let e = parse("checkout.session.completed", json!({"customer_email": 42}));
        assert!(e.into_handled().is_err());
    }

    #[test]
    fn test_inline_email_order() {
        let object: EventObject = serde_json::from_value(json!({
            "customer_email": "first@example.com",
            "customer_details": {"email": "second@example.com"},
        }))
        .unwrap();
        assert_eq!(object.inline_email(), Some("first@example.com"));

        let object: EventObject = serde_json::from_value(json!({
            "customer_email": null,
            "customer_details": {"email": "second@example.com"},
        }))
        .unwrap();
        assert_eq!(object.inline_email(), Some("second@example.com"));

        let object: EventObject =
            serde_json::from_value(json!({"customer": "cus_1"})).unwrap();
        assert_eq!(object.inline_email(), None);
        assert_eq!(object.customer.unwrap().id(), "cus_1");

        let object: EventObject =
            serde_json::from_value(json!({"customer": {"id": "cus_2", "object": "customer"}}))
                .unwrap();
        assert_eq!(object.customer.unwrap().id(), "cus_2");
    }
}
