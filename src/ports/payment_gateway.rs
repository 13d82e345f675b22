//! PaymentGateway port - external payment processing.
//!
//! The contract is deliberately narrow: the gateway is asked to open checkout
//! sessions and to cancel subscriptions. Everything else the system learns
//! about billing arrives through webhooks, never through polling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a recurring subscription.
    ///
    /// Returns the session the client is redirected to. The metadata map is
    /// echoed back on the completion webhook.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Request cancellation of a subscription.
    ///
    /// With `at_period_end` the subscription keeps billing status until the
    /// period closes; the deletion webhook arrives when it actually ends.
    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
        at_period_end: bool,
    ) -> Result<(), GatewayError>;

    /// Fetch the gateway's current view of a subscription.
    ///
    /// Diagnostic escape hatch only - reconciliation is webhook-driven and
    /// never polls this.
    async fn get_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, GatewayError>;
}

/// The gateway's authoritative view of a subscription at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Gateway subscription id (sub_xxx format).
    pub id: String,

    /// Gateway status string ("trialing", "active", "past_due", "canceled", ...).
    pub status: String,

    /// Current billing period start (Unix timestamp).
    pub current_period_start: Option<i64>,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: Option<i64>,

    /// Whether the subscription ends when the period closes.
    pub cancel_at_period_end: bool,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// The gateway price to bill against.
    pub price_id: String,

    /// Connected account receiving the funds.
    pub creator_account_id: String,

    /// Platform fee in basis points (e.g. 1000 = 10%).
    pub platform_fee_bps: u32,

    /// Trial length in days, if the program offers one.
    pub trial_days: Option<u32>,

    /// URL to redirect to after successful checkout.
    pub success_url: String,

    /// URL to redirect to after abandoned checkout.
    pub cancel_url: String,

    /// Echoed back on the completion webhook. Carries the internal
    /// subscription id so the reconciler can correlate.
    pub metadata: HashMap<String, String>,
}

/// Checkout session returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// The gateway's session id (cs_xxx format).
    pub id: String,

    /// URL for the client to complete payment.
    pub url: String,

    /// When the session expires (Unix timestamp).
    pub expires_at: i64,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Authentication, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Provider, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        DomainError::new(ErrorCode::GatewayUnavailable, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    Network,

    /// API authentication failed.
    Authentication,

    /// The gateway rejected the request parameters.
    InvalidRequest,

    /// Referenced gateway resource does not exist.
    NotFound,

    /// Rate limit exceeded.
    RateLimited,

    /// Gateway-side error.
    Provider,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::Network | GatewayErrorCode::RateLimited | GatewayErrorCode::Provider
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Network => "network_error",
            GatewayErrorCode::Authentication => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::Provider => "provider_error",
        };
        write!(f, "{}", s)
    }
}
