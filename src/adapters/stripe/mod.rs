//! Stripe payment gateway adapter.

mod gateway;
mod mock;

pub use gateway::StripeGateway;
pub use mock::MockPaymentGateway;
