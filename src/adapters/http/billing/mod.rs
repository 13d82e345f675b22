//! HTTP adapter for billing endpoints.
//!
//! Exposes the subscription lifecycle via REST:
//! - `POST /api/billing/checkout` - start a checkout
//! - `GET /api/billing/subscriptions/:id` - subscription summary
//! - `POST /api/billing/subscriptions/:id/cancel` - cancel at period end
//! - `POST /api/billing/webhooks/payment` - gateway webhook (signature verified)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, BillingAppState, SIGNATURE_HEADER};
pub use routes::billing_router;
