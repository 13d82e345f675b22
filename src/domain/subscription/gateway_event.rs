//! Payment-gateway webhook event envelope.
//!
//! Only the fields the reconciler reads are captured; the rest of the
//! gateway's event schema is ignored.

use serde::{Deserialize, Serialize};

/// A webhook event delivered by the payment gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Unique identifier for the event (evt_xxx format). Idempotency key.
    pub id: String,

    /// Event type string (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Event-specific payload.
    pub data: GatewayEventData,

    /// Whether this is a live mode event (vs test mode).
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEventData {
    /// The object that triggered the event; shape depends on the event type.
    pub object: serde_json::Value,
}

impl GatewayEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> GatewayEventType {
        GatewayEventType::parse(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Event types the reconciler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventType {
    /// Checkout session completed; first confirmation of a subscription.
    CheckoutSessionCompleted,
    /// Subscription status snapshot changed (trial ended, payment failed,
    /// payment recovered, intent flag flipped).
    SubscriptionUpdated,
    /// Subscription ended at the gateway.
    SubscriptionDeleted,
    /// A recurring invoice was paid.
    InvoicePaid,
    /// Anything else; acknowledged and ignored.
    Unknown,
}

impl GatewayEventType {
    /// Parse event type from the gateway's type string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.paid" => Self::InvoicePaid,
            _ => Self::Unknown,
        }
    }

    /// The gateway's type string for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaid => "invoice.paid",
            Self::Unknown => "unknown",
        }
    }
}

/// Builder for creating test GatewayEvent instances.
#[cfg(test)]
pub struct GatewayEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for GatewayEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl GatewayEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> GatewayEvent {
        GatewayEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: GatewayEventData {
                object: self.object,
            },
            livemode: self.livemode,
        }
    }
}
