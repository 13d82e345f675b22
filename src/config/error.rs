//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid gateway API key format")]
    InvalidGatewayKey,

    #[error("Invalid webhook secret format")]
    InvalidWebhookSecret,

    #[error("Platform fee must be between 0 and 10000 basis points")]
    InvalidPlatformFee,

    #[error("Invalid URL: {0}")]
    InvalidUrl(&'static str),

    #[error("Abandoned checkout window must be at least 1 hour")]
    InvalidSweepWindow,

    #[error("Channel provisioning timeout must be at least 1 second")]
    InvalidProvisionTimeout,
}
