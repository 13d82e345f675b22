//! Chat provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Chat provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Chat provider API key
    pub api_key: String,

    /// Chat provider API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.chatkit.dev/v1".to_string()
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl MessagingConfig {
    /// Validate messaging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("MESSAGING_API_KEY"));
        }
        if !self.api_base.starts_with("http") {
            return Err(ValidationError::InvalidUrl("MESSAGING_API_BASE"));
        }
        Ok(())
    }
}
