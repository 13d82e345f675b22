//! Scriptable in-process chat provider for tests and local development.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::ports::{Channel, CreateChannelRequest, MessagingError, MessagingGateway};

/// Mock messaging gateway.
///
/// Channel creation is idempotent per channel name, matching the contract the
/// live provider offers. Calls are recorded for assertions and a failure
/// toggle makes every operation return a provider error.
#[derive(Default)]
pub struct MockMessagingGateway {
    fail: AtomicBool,
    channels: Mutex<Vec<(String, Channel)>>,
    messages: Mutex<Vec<(String, String)>>,
    archived: Mutex<Vec<String>>,
}

impl MockMessagingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a provider error.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Channels created so far.
    pub async fn created_channels(&self) -> Vec<Channel> {
        self.channels.lock().await.iter().map(|(_, c)| c.clone()).collect()
    }

    /// System messages sent so far, as `(channel_id, text)`.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }

    /// Channel ids archived so far.
    pub async fn archived_channels(&self) -> Vec<String> {
        self.archived.lock().await.clone()
    }
}

#[async_trait]
impl MessagingGateway for MockMessagingGateway {
    async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<Channel, MessagingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessagingError::Provider("provider down".to_string()));
        }
        let mut channels = self.channels.lock().await;
        if let Some((_, existing)) = channels.iter().find(|(name, _)| *name == request.name) {
            return Ok(existing.clone());
        }
        let channel = Channel {
            id: format!("ch_mock_{}", channels.len() + 1),
        };
        channels.push((request.name, channel.clone()));
        Ok(channel)
    }

    async fn send_system_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<(), MessagingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessagingError::Provider("provider down".to_string()));
        }
        self.messages
            .lock()
            .await
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn archive_channel(&self, channel_id: &str) -> Result<(), MessagingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MessagingError::Provider("provider down".to_string()));
        }
        self.archived.lock().await.push(channel_id.to_string());
        Ok(())
    }
}
