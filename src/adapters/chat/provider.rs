//! HTTP chat provider implementation of the `MessagingGateway` port.
//!
//! Talks to a hosted chat API with JSON request bodies and bearer auth.
//! Channel creation is keyed by name on the provider side, so a retried
//! create returns the existing channel rather than a duplicate.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::MessagingConfig;
use crate::ports::{Channel, CreateChannelRequest, MessagingError, MessagingGateway};

/// Live chat provider adapter.
pub struct ChatProvider {
    api_key: SecretString,
    api_base: String,
    http_client: reqwest::Client,
}

impl ChatProvider {
    pub fn new(config: &MessagingConfig) -> Self {
        Self {
            api_key: SecretString::new(config.api_key.clone()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn error_from_response(
        response: reqwest::Response,
        channel_id: Option<&str>,
    ) -> MessagingError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, error = %body, "chat provider request failed");
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = channel_id {
                return MessagingError::ChannelNotFound(id.to_string());
            }
        }
        MessagingError::Provider(format!("{}: {}", status, body))
    }
}

#[async_trait]
impl MessagingGateway for ChatProvider {
    async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<Channel, MessagingError> {
        let url = format!("{}/channels", self.api_base);

        let body = CreateChannelBody {
            name: request.name,
            members: vec![
                request.client_id.to_string(),
                request.creator_id.to_string(),
            ],
            // Existing channel with the same name is returned as-is.
            get_or_create: true,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| MessagingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, None).await);
        }

        let channel: ChannelResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Provider(format!("unparseable response: {}", e)))?;

        Ok(Channel { id: channel.id })
    }

    async fn send_system_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<(), MessagingError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&SendMessageBody {
                text: text.to_string(),
                system: true,
            })
            .send()
            .await
            .map_err(|e| MessagingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, Some(channel_id)).await);
        }

        Ok(())
    }

    async fn archive_channel(&self, channel_id: &str) -> Result<(), MessagingError> {
        let url = format!("{}/channels/{}/archive", self.api_base, channel_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| MessagingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, Some(channel_id)).await);
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CreateChannelBody {
    name: String,
    members: Vec<String>,
    get_or_create: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageBody {
    text: String,
    system: bool,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
}
