//! Stripe implementation of the `PaymentGateway` port.
//!
//! Uses Stripe's form-encoded REST API directly. Sessions are created in
//! Connect destination-charge mode: funds route to the creator's connected
//! account and the platform fee is expressed as an application fee percent.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::PaymentConfig;
use crate::ports::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, SubscriptionSnapshot,
};

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Checkout sessions expire after 24 hours unless the response says otherwise.
const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Live Stripe payment gateway.
pub struct StripeGateway {
    api_key: SecretString,
    api_base: String,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            api_key: SecretString::new(config.api_key.clone()),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            http_client: reqwest::Client::new(),
        }
    }

    fn map_error_status(status: reqwest::StatusCode, body: String) -> GatewayError {
        match status.as_u16() {
            401 | 403 => GatewayError::authentication(body),
            404 => GatewayError::not_found("gateway resource"),
            429 => GatewayError::new(crate::ports::GatewayErrorCode::RateLimited, body),
            400..=499 => GatewayError::invalid_request(body),
            _ => GatewayError::provider(body),
        }
    }

    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, error = %body, "gateway request failed");
        Self::map_error_status(status, body)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let mut params = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), request.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            (
                "subscription_data[transfer_data][destination]".to_string(),
                request.creator_account_id,
            ),
            (
                "subscription_data[application_fee_percent]".to_string(),
                format!("{:.2}", request.platform_fee_bps as f64 / 100.0),
            ),
        ];

        if let Some(days) = request.trial_days {
            params.push((
                "subscription_data[trial_period_days]".to_string(),
                days.to_string(),
            ));
        }

        for (key, value) in request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
            // The completion webhook carries the subscription object, so the
            // correlation keys ride on it as well.
            params.push((format!("subscription_data[metadata][{}]", key), value));
        }

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::provider(format!("unparseable response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| GatewayError::provider("checkout session has no redirect url"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at: session
                .expires_at
                .unwrap_or_else(|| chrono::Utc::now().timestamp() + SESSION_TTL_SECS),
        })
    }

    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
        at_period_end: bool,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.api_base, gateway_subscription_id
        );

        let response = if at_period_end {
            self.http_client
                .post(&url)
                .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
                .form(&[("cancel_at_period_end", "true")])
                .send()
                .await
        } else {
            self.http_client
                .delete(&url)
                .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
                .send()
                .await
        }
        .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }

    async fn get_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.api_base, gateway_subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let sub: SubscriptionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::provider(format!("unparseable response: {}", e)))?;

        Ok(Some(SubscriptionSnapshot {
            id: sub.id,
            status: sub.status,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    id: String,
    status: String,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
    expires_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> StripeGateway {
        StripeGateway::new(&PaymentConfig {
            api_key: "sk_test_key".to_string(),
            webhook_secret: "whsec_test".to_string(),
            api_base: Some("http://localhost:12111".to_string()),
        })
    }

    #[test]
    fn api_base_override_is_applied() {
        let gateway = gateway();
        assert_eq!(gateway.api_base, "http://localhost:12111");
    }

    #[test]
    fn default_api_base_points_at_stripe() {
        let gateway = StripeGateway::new(&PaymentConfig {
            api_key: "sk_test_key".to_string(),
            webhook_secret: "whsec_test".to_string(),
            api_base: None,
        });
        assert_eq!(gateway.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err =
            StripeGateway::map_error_status(reqwest::StatusCode::BAD_REQUEST, "bad".to_string());
        assert!(!err.retryable);

        let err = StripeGateway::map_error_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "no".to_string(),
        );
        assert!(!err.retryable);
    }

    #[test]
    fn throttling_and_server_errors_are_retryable() {
        let err = StripeGateway::map_error_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
        );
        assert!(err.retryable);

        let err = StripeGateway::map_error_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "oops".to_string(),
        );
        assert!(err.retryable);
    }

    #[test]
    fn session_response_parses_with_missing_optionals() {
        let session: CheckoutSessionResponse =
            serde_json::from_str(r#"{"id": "cs_test_1"}"#).unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.is_none());
        assert!(session.expires_at.is_none());
    }
}
