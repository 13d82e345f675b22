//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, get_subscription, handle_payment_webhook, start_checkout,
    BillingAppState,
};

/// Client-facing billing routes.
///
/// - `POST /checkout` - start a checkout for a program
/// - `GET /subscriptions/:id` - subscription summary
/// - `POST /subscriptions/:id/cancel` - cancel at period end
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/subscriptions/:id", get(get_subscription))
        .route("/subscriptions/:id/cancel", post(cancel_subscription))
}

/// Webhook routes. Separate from the client routes: deliveries carry no user
/// session and are authenticated by signature instead.
///
/// - `POST /payment` - payment gateway event delivery
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/payment", post(handle_payment_webhook))
}

/// The complete billing module router, for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/billing/webhooks", webhook_routes())
}
