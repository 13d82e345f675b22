//! Command handlers.

mod handle_gateway_webhook;
mod provision_channel;
mod request_cancellation;
mod start_checkout;
mod sweep_abandoned_checkouts;

pub use handle_gateway_webhook::{
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, HandleGatewayWebhookResult,
};
pub use provision_channel::ChannelProvisioner;
pub use request_cancellation::{RequestCancellationCommand, RequestCancellationHandler};
pub use start_checkout::{StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult};
pub use sweep_abandoned_checkouts::{SweepAbandonedCheckoutsHandler, SweepReport};
