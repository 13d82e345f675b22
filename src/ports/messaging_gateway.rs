//! MessagingGateway port - chat channel provisioning.
//!
//! Provisioning is best-effort: billing outcomes never depend on it. Callers
//! run these operations behind their own error boundary and a timeout, and a
//! failure only produces a log line and a retry opportunity later.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Request to create a coaching channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    /// Client member of the channel.
    pub client_id: UserId,

    /// Creator member of the channel.
    pub creator_id: UserId,

    /// Display name for the channel.
    pub name: String,
}

/// A provisioned chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The chat provider's channel id.
    pub id: String,
}

/// Errors from the chat provider.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    /// Network connectivity issue.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected the request.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Referenced channel does not exist.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),
}

/// Port for chat channel provisioning.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Create a channel for a new coaching relationship.
    ///
    /// Must be idempotent per (client, creator, name): retries after a
    /// partial failure return the existing channel.
    async fn create_channel(&self, request: CreateChannelRequest)
        -> Result<Channel, MessagingError>;

    /// Post a system message to a channel.
    async fn send_system_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<(), MessagingError>;

    /// Archive a channel when the relationship ends. The history stays
    /// readable; new messages are rejected by the provider.
    async fn archive_channel(&self, channel_id: &str) -> Result<(), MessagingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messaging_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn MessagingGateway) {}
    }

    #[test]
    fn errors_display_their_detail() {
        let err = MessagingError::ChannelNotFound("ch_123".to_string());
        assert_eq!(err.to_string(), "Channel not found: ch_123");
    }
}
