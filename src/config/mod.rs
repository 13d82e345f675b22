//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `COACHMARKET`
//! prefix and nested sections separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use coachmarket::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod billing;
mod error;
mod messaging;
mod payment;
mod server;

pub use billing::BillingConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Payment gateway configuration
    pub payment: PaymentConfig,

    /// Chat provider configuration
    pub messaging: MessagingConfig,

    /// Billing policy (fees, redirect URLs, sweep window)
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads a `.env` file if present, then environment variables with the
    /// `COACHMARKET` prefix. `COACHMARKET__PAYMENT__API_KEY=sk_test_x` maps to
    /// `payment.api_key`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COACHMARKET")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate()?;
        self.messaging.validate()?;
        self.billing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize these tests.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("COACHMARKET__PAYMENT__API_KEY", "sk_test_xxx");
        env::set_var("COACHMARKET__PAYMENT__WEBHOOK_SECRET", "whsec_xxx");
        env::set_var("COACHMARKET__MESSAGING__API_KEY", "ck_test_xxx");
    }

    fn clear_env() {
        env::remove_var("COACHMARKET__PAYMENT__API_KEY");
        env::remove_var("COACHMARKET__PAYMENT__WEBHOOK_SECRET");
        env::remove_var("COACHMARKET__MESSAGING__API_KEY");
        env::remove_var("COACHMARKET__SERVER__PORT");
        env::remove_var("COACHMARKET__SERVER__ENVIRONMENT");
    }

    #[test]
    fn load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.payment.api_key, "sk_test_xxx");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.billing.abandoned_after_hours, 24);
    }

    #[test]
    fn production_environment_is_detected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("COACHMARKET__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }
}
