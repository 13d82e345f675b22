//! ChannelProvisioner - best-effort chat channel lifecycle.
//!
//! Billing is the system of record; chat is a convenience. Every call here is
//! wrapped in a timeout and its own error boundary: a slow or failing chat
//! provider produces a warning log and nothing else. Callers treat a `None`
//! return as "no channel yet", never as a billing failure.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::subscription::Subscription;
use crate::ports::{CreateChannelRequest, MessagingGateway};

const WELCOME_MESSAGE: &str =
    "Welcome! This is your coaching channel. Introduce yourself to get started.";

const CLOSING_MESSAGE: &str =
    "This coaching relationship has ended. The channel is now read-only.";

/// Best-effort channel provisioning around the messaging gateway.
pub struct ChannelProvisioner {
    messaging: Arc<dyn MessagingGateway>,
    timeout: Duration,
}

impl ChannelProvisioner {
    pub fn new(messaging: Arc<dyn MessagingGateway>, timeout: Duration) -> Self {
        Self { messaging, timeout }
    }

    /// Creates the coaching channel for a confirmed subscription.
    ///
    /// Returns the channel id on success, `None` on any failure or timeout.
    /// The welcome message is itself best-effort on top of channel creation.
    pub async fn provision(&self, subscription: &Subscription) -> Option<String> {
        // Name is the provider-side idempotency key: retrying after a partial
        // failure lands on the same channel.
        let request = CreateChannelRequest {
            client_id: subscription.client_id.clone(),
            creator_id: subscription.creator_id.clone(),
            name: format!(
                "coaching-{}-{}",
                subscription.creator_id, subscription.client_id
            ),
        };

        let channel = match tokio::time::timeout(
            self.timeout,
            self.messaging.create_channel(request),
        )
        .await
        {
            Ok(Ok(channel)) => channel,
            Ok(Err(err)) => {
                warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "channel provisioning failed"
                );
                return None;
            }
            Err(_) => {
                warn!(
                    subscription_id = %subscription.id,
                    "channel provisioning timed out"
                );
                return None;
            }
        };

        match tokio::time::timeout(
            self.timeout,
            self.messaging.send_system_message(&channel.id, WELCOME_MESSAGE),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(channel_id = %channel.id, error = %err, "welcome message failed");
            }
            Err(_) => {
                warn!(channel_id = %channel.id, "welcome message timed out");
            }
        }

        Some(channel.id)
    }

    /// Archives the channel when a subscription ends. Failures are logged.
    pub async fn archive(&self, channel_id: &str) {
        // Closing note before the provider locks the channel.
        match tokio::time::timeout(
            self.timeout,
            self.messaging.send_system_message(channel_id, CLOSING_MESSAGE),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(channel_id = %channel_id, error = %err, "closing message failed");
            }
            Err(_) => {
                warn!(channel_id = %channel_id, "closing message timed out");
            }
        }

        match tokio::time::timeout(self.timeout, self.messaging.archive_channel(channel_id)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(channel_id = %channel_id, error = %err, "channel archive failed");
            }
            Err(_) => {
                warn!(channel_id = %channel_id, "channel archive timed out");
            }
        }
    }
}
