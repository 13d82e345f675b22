//! Subscription domain - The entitlement ledger and billing state machine.
//!
//! One Subscription exists per (client, program) purchase attempt. The
//! aggregate is the local source of truth for access; authoritative status is
//! driven by reconciled payment-gateway events, never by request handlers.

mod aggregate;
mod errors;
mod gateway_event;
mod status;
mod webhook_errors;
mod webhook_verifier;

pub use aggregate::Subscription;
pub use errors::BillingError;
pub use gateway_event::{GatewayEvent, GatewayEventData, GatewayEventType};
pub use status::SubscriptionStatus;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use gateway_event::GatewayEventBuilder;
#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
