//! SubscriptionStore port - persistence for the entitlement ledger.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProgramId, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::Subscription;

/// Port for subscription persistence.
///
/// Lookup keys mirror the two identifier spaces: internal ids for request
/// handlers, gateway references for the webhook reconciler.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Find a subscription by id.
    async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Insert or update a subscription.
    async fn save(&self, subscription: Subscription) -> Result<(), DomainError>;

    /// Find by the gateway checkout session id (confirmation idempotency key).
    async fn find_by_checkout_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find by the gateway subscription id.
    async fn find_by_gateway_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find a subscription for this (client, program) that blocks a new
    /// checkout: anything not `Canceled`, including `Pending`.
    async fn find_blocking(
        &self,
        client_id: &UserId,
        program_id: ProgramId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find `Pending` subscriptions created before the cutoff.
    ///
    /// Feeds the abandonment sweep.
    async fn find_pending_created_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}
