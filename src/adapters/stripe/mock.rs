//! Scriptable in-process payment gateway for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::ports::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, SubscriptionSnapshot,
};

/// Mock payment gateway.
///
/// Records every call and hands out deterministic session ids
/// (`cs_mock_1`, `cs_mock_2`, ...). Failure modes are toggled at runtime so a
/// test can flip the gateway mid-scenario.
#[derive(Default)]
pub struct MockPaymentGateway {
    fail_checkout: AtomicBool,
    fail_cancel: AtomicBool,
    checkout_requests: Mutex<Vec<CheckoutRequest>>,
    cancellations: Mutex<Vec<(String, bool)>>,
    snapshots: Mutex<HashMap<String, SubscriptionSnapshot>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_checkout_session` fail with a network error.
    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    /// Make `cancel_subscription` fail with a provider error.
    pub fn fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    /// Script the snapshot returned by `get_subscription`.
    pub async fn set_snapshot(&self, snapshot: SubscriptionSnapshot) {
        self.snapshots
            .lock()
            .await
            .insert(snapshot.id.clone(), snapshot);
    }

    /// Checkout requests seen so far.
    pub async fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkout_requests.lock().await.clone()
    }

    /// Cancellations seen so far, as `(gateway_subscription_id, at_period_end)`.
    pub async fn cancellations(&self) -> Vec<(String, bool)> {
        self.cancellations.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut requests = self.checkout_requests.lock().await;
        requests.push(request);
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(GatewayError::network("connection refused"));
        }
        let n = requests.len();
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", n),
            url: format!("https://checkout.mock/cs_mock_{}", n),
            expires_at: chrono::Utc::now().timestamp() + 86_400,
        })
    }

    async fn cancel_subscription(
        &self,
        gateway_subscription_id: &str,
        at_period_end: bool,
    ) -> Result<(), GatewayError> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(GatewayError::provider("processor unavailable"));
        }
        self.cancellations
            .lock()
            .await
            .push((gateway_subscription_id.to_string(), at_period_end));
        Ok(())
    }

    async fn get_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<SubscriptionSnapshot>, GatewayError> {
        Ok(self
            .snapshots
            .lock()
            .await
            .get(gateway_subscription_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_basic".to_string(),
            creator_account_id: "acct_1".to_string(),
            platform_fee_bps: 1000,
            trial_days: None,
            success_url: "https://app.test/success".to_string(),
            cancel_url: "https://app.test/cancel".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn sessions_are_numbered_and_recorded() {
        let gateway = MockPaymentGateway::new();
        let first = gateway.create_checkout_session(request()).await.unwrap();
        let second = gateway.create_checkout_session(request()).await.unwrap();

        assert_eq!(first.id, "cs_mock_1");
        assert_eq!(second.id, "cs_mock_2");
        assert_eq!(gateway.checkout_requests().await.len(), 2);
    }

    #[tokio::test]
    async fn failure_toggle_applies_immediately() {
        let gateway = MockPaymentGateway::new();
        gateway.fail_checkout(true);
        assert!(gateway.create_checkout_session(request()).await.is_err());

        gateway.fail_checkout(false);
        assert!(gateway.create_checkout_session(request()).await.is_ok());
    }

    #[tokio::test]
    async fn scripted_snapshot_is_returned() {
        let gateway = MockPaymentGateway::new();
        gateway
            .set_snapshot(SubscriptionSnapshot {
                id: "sub_1".to_string(),
                status: "active".to_string(),
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
            })
            .await;

        let snapshot = gateway.get_subscription("sub_1").await.unwrap().unwrap();
        assert_eq!(snapshot.status, "active");
        assert!(gateway.get_subscription("sub_2").await.unwrap().is_none());
    }
}
