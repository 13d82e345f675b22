//! JSON request/response types for the billing API.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::{Subscription, SubscriptionStatus};

/// Request to start a checkout for a program.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCheckoutBody {
    /// Client starting the subscription.
    pub client_id: String,
    /// Program being subscribed to.
    pub program_id: String,
}

/// Response for a started checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub subscription_id: String,
    pub checkout_session_id: String,
    pub checkout_url: String,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionBody {
    /// Client making the request; must own the subscription.
    pub requested_by: String,
    /// Cancel now instead of at period end. Defaults to false.
    #[serde(default)]
    pub immediate: bool,
}

/// Read-side summary of a subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub id: String,
    pub client_id: String,
    pub program_id: String,
    pub status: SubscriptionStatus,
    pub has_access: bool,
    pub cancel_at_period_end: bool,
    pub trial_end: Option<String>,
    pub current_period_end: Option<String>,
    pub channel_id: Option<String>,
    pub total_paid_cents: i64,
    pub total_platform_fee_cents: i64,
    pub created_at: String,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            client_id: subscription.client_id.to_string(),
            program_id: subscription.program_id.to_string(),
            status: subscription.status,
            has_access: subscription.status.has_access(),
            cancel_at_period_end: subscription.cancel_at_period_end,
            trial_end: subscription
                .trial_end
                .as_ref()
                .map(|t| t.as_datetime().to_rfc3339()),
            current_period_end: subscription
                .current_period_end
                .as_ref()
                .map(|t| t.as_datetime().to_rfc3339()),
            channel_id: subscription.channel_id.clone(),
            total_paid_cents: subscription.total_paid_cents,
            total_platform_fee_cents: subscription.total_platform_fee_cents,
            created_at: subscription.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Acknowledgement body for webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
