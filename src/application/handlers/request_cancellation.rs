//! RequestCancellationHandler - client-initiated cancellation.
//!
//! Issues the gateway call and, for the period-end flavor, records local
//! intent. Status never changes here: the gateway emits a deletion event
//! (at period close, or right away for an immediate cancel) and the webhook
//! reconciler performs the actual teardown. The gateway call goes first so a
//! local flag is never set for a cancellation the processor does not know
//! about.

use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscription::{BillingError, Subscription};
use crate::ports::{PaymentGateway, SubscriptionStore};

/// Command to request cancellation of a subscription.
#[derive(Debug, Clone)]
pub struct RequestCancellationCommand {
    pub subscription_id: SubscriptionId,
    pub requested_by: UserId,
    /// Cancel right away instead of at the end of the current period.
    pub immediate: bool,
}

/// Handler for cancellation requests.
pub struct RequestCancellationHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl RequestCancellationHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
        }
    }

    /// Requests cancellation, at period end by default or immediately.
    ///
    /// The period-end form is idempotent: repeating the request after the
    /// flag is set succeeds without another gateway call. An immediate
    /// request always reaches the gateway, including as an escalation of an
    /// earlier period-end request.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the id is unknown
    /// - `Forbidden` if the requester is not the subscribing client
    /// - `InvalidStateTransition` if the subscription is not yet confirmed or
    ///   already canceled
    /// - `GatewayUnavailable` if the processor rejects the cancellation
    pub async fn handle(
        &self,
        cmd: RequestCancellationCommand,
    ) -> Result<Subscription, DomainError> {
        let mut subscription = self
            .subscriptions
            .get(cmd.subscription_id)
            .await?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        if subscription.client_id != cmd.requested_by {
            return Err(
                BillingError::unauthorized(cmd.requested_by, cmd.subscription_id).into(),
            );
        }

        if !subscription.status.is_billable() {
            return Err(BillingError::invalid_state(
                format!("{:?}", subscription.status),
                "cancel",
            )
            .into());
        }
        let Some(gateway_subscription_id) = subscription.gateway_subscription_id.clone() else {
            return Err(BillingError::invalid_state(
                format!("{:?}", subscription.status),
                "cancel",
            )
            .into());
        };

        if !cmd.immediate && subscription.cancel_at_period_end {
            return Ok(subscription);
        }

        self.gateway
            .cancel_subscription(&gateway_subscription_id, !cmd.immediate)
            .await
            .map_err(|err| BillingError::gateway(err.to_string()))?;

        if cmd.immediate {
            // No local mutation: the gateway cancels now and its deletion
            // event drives the teardown through the reconciler.
            info!(
                subscription_id = %subscription.id,
                "immediate cancellation issued; awaiting deletion event"
            );
        } else {
            subscription.set_cancel_at_period_end(true);
            self.subscriptions.save(subscription.clone()).await?;

            info!(
                subscription_id = %subscription.id,
                "cancellation requested; access continues to period end"
            );
        }

        Ok(subscription)
    }
}
