//! Billing policy configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Billing policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Platform fee in basis points (1000 = 10%)
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,

    /// Redirect after successful checkout
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Redirect after abandoned checkout
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    /// Hours before a pending checkout is considered abandoned
    #[serde(default = "default_abandoned_after_hours")]
    pub abandoned_after_hours: u64,

    /// Timeout for best-effort channel provisioning calls
    #[serde(default = "default_provision_timeout_secs")]
    pub provision_timeout_secs: u64,

    /// Days to retain processed webhook event records
    #[serde(default = "default_event_retention_days")]
    pub event_retention_days: i64,
}

fn default_platform_fee_bps() -> u32 {
    1000
}

fn default_success_url() -> String {
    "https://app.coachmarket.dev/checkout/success".to_string()
}

fn default_cancel_url() -> String {
    "https://app.coachmarket.dev/checkout/canceled".to_string()
}

fn default_abandoned_after_hours() -> u64 {
    // Matches the gateway's checkout session expiry.
    24
}

fn default_provision_timeout_secs() -> u64 {
    10
}

fn default_event_retention_days() -> i64 {
    30
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_platform_fee_bps(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            abandoned_after_hours: default_abandoned_after_hours(),
            provision_timeout_secs: default_provision_timeout_secs(),
            event_retention_days: default_event_retention_days(),
        }
    }
}

impl BillingConfig {
    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.platform_fee_bps > 10_000 {
            return Err(ValidationError::InvalidPlatformFee);
        }
        if !self.success_url.starts_with("http") {
            return Err(ValidationError::InvalidUrl("BILLING_SUCCESS_URL"));
        }
        if !self.cancel_url.starts_with("http") {
            return Err(ValidationError::InvalidUrl("BILLING_CANCEL_URL"));
        }
        if self.abandoned_after_hours == 0 {
            return Err(ValidationError::InvalidSweepWindow);
        }
        if self.provision_timeout_secs == 0 {
            return Err(ValidationError::InvalidProvisionTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.platform_fee_bps, 1000);
        assert_eq!(config.abandoned_after_hours, 24);
    }

    #[test]
    fn fee_above_hundred_percent_fails() {
        let config = BillingConfig {
            platform_fee_bps: 10_001,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPlatformFee)
        ));
    }

    #[test]
    fn zero_sweep_window_fails() {
        let config = BillingConfig {
            abandoned_after_hours: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSweepWindow)
        ));
    }

    #[test]
    fn non_http_urls_fail() {
        let config = BillingConfig {
            success_url: "ftp://bad".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
