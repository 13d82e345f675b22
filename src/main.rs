//! Coachmarket service entry point.
//!
//! Wires configuration, adapters, and handlers, serves the HTTP API, and runs
//! the abandonment sweep on a fixed schedule.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coachmarket::adapters::chat::ChatProvider;
use coachmarket::adapters::http::{app_router, BillingAppState};
use coachmarket::adapters::memory::{
    InMemoryCreatorAccountStore, InMemoryProgramStore, InMemorySubscriptionStore,
    InMemoryWebhookEventStore,
};
use coachmarket::adapters::stripe::StripeGateway;
use coachmarket::application::handlers::{
    ChannelProvisioner, HandleGatewayWebhookHandler, RequestCancellationHandler,
    StartCheckoutHandler, SweepAbandonedCheckoutsHandler,
};
use coachmarket::config::AppConfig;
use coachmarket::domain::subscription::WebhookVerifier;
use coachmarket::ports::{
    CreatorAccountStore, MessagingGateway, PaymentGateway, ProgramStore, SubscriptionStore,
    WebhookEventStore,
};

/// How often the abandonment sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let programs: Arc<dyn ProgramStore> = Arc::new(InMemoryProgramStore::new());
    let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(InMemorySubscriptionStore::new());
    let creator_accounts: Arc<dyn CreatorAccountStore> =
        Arc::new(InMemoryCreatorAccountStore::new());
    let events: Arc<dyn WebhookEventStore> = Arc::new(InMemoryWebhookEventStore::new());

    let payment_gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.payment));
    let messaging: Arc<dyn MessagingGateway> = Arc::new(ChatProvider::new(&config.messaging));
    let provisioner = Arc::new(ChannelProvisioner::new(
        Arc::clone(&messaging),
        Duration::from_secs(config.billing.provision_timeout_secs),
    ));

    let checkout = Arc::new(StartCheckoutHandler::new(
        Arc::clone(&programs),
        Arc::clone(&subscriptions),
        Arc::clone(&creator_accounts),
        Arc::clone(&payment_gateway),
        config.billing.clone(),
    ));
    let cancellation = Arc::new(RequestCancellationHandler::new(
        Arc::clone(&subscriptions),
        Arc::clone(&payment_gateway),
    ));
    let webhook = Arc::new(HandleGatewayWebhookHandler::new(
        WebhookVerifier::new(config.payment.webhook_secret.clone()),
        Arc::clone(&programs),
        Arc::clone(&subscriptions),
        Arc::clone(&events),
        Arc::clone(&provisioner),
    ));
    let sweep = Arc::new(SweepAbandonedCheckoutsHandler::new(
        Arc::clone(&subscriptions),
        Arc::clone(&programs),
        Arc::clone(&events),
        config.billing.clone(),
    ));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = sweep.handle().await {
                error!(error = %err, "abandonment sweep failed");
            }
        }
    });

    let app = app_router(BillingAppState {
        checkout,
        cancellation,
        webhook,
        subscriptions,
    });

    let addr = config.server.parse_socket_addr()?;
    info!(%addr, environment = ?config.server.environment, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
