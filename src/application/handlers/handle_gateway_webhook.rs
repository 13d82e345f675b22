//! HandleGatewayWebhookHandler - reconciles gateway events into local state.
//!
//! This is the only writer of authoritative subscription status. The pipeline
//! is: verify signature, dedupe by event id, serialize per subscription,
//! apply, then commit the dedupe record. The success response to the gateway
//! goes out only after the authoritative commit; channel provisioning runs
//! after that commit and can never fail it.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::handlers::ChannelProvisioner;
use crate::application::keyed_lock::KeyedLock;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    GatewayEvent, GatewayEventType, Subscription, SubscriptionStatus, WebhookError,
    WebhookVerifier,
};
use crate::ports::{
    ProgramStore, SaveResult, SlotReservation, SubscriptionStore, WebhookEventRecord,
    WebhookEventStore,
};

/// Command to process a gateway webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleGatewayWebhookResult {
    /// First confirmation applied; subscription is live.
    SubscriptionConfirmed { subscription_id: SubscriptionId },
    /// Status snapshot overwrote local state.
    SnapshotApplied { subscription_id: SubscriptionId },
    /// Subscription ended; slot released and channel archived.
    SubscriptionEnded { subscription_id: SubscriptionId },
    /// Invoice totals recorded.
    InvoiceRecorded { subscription_id: SubscriptionId },
    /// Event id seen before; nothing done.
    AlreadyProcessed,
    /// Event acknowledged and deliberately dropped.
    Ignored,
}

/// What a dispatch branch decided, before the dedupe record is written.
enum Outcome {
    Applied(HandleGatewayWebhookResult),
    Dropped(String),
}

/// Handler for gateway webhook deliveries.
pub struct HandleGatewayWebhookHandler {
    verifier: WebhookVerifier,
    programs: Arc<dyn ProgramStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    events: Arc<dyn WebhookEventStore>,
    provisioner: Arc<ChannelProvisioner>,
    locks: KeyedLock,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        programs: Arc<dyn ProgramStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        events: Arc<dyn WebhookEventStore>,
        provisioner: Arc<ChannelProvisioner>,
    ) -> Self {
        Self {
            verifier,
            programs,
            subscriptions,
            events,
            provisioner,
            locks: KeyedLock::new(),
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayWebhookCommand,
    ) -> Result<HandleGatewayWebhookResult, WebhookError> {
        // 1. Verify before touching any state
        let event = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;

        // 2. Dedupe by event id
        if self
            .events
            .find_by_event_id(&event.id)
            .await
            .map_err(storage)?
            .is_some()
        {
            return Ok(HandleGatewayWebhookResult::AlreadyProcessed);
        }

        // 3. Dispatch. A hard error here leaves no dedupe record, so the
        //    gateway retries and the idempotent handlers absorb the replay.
        let outcome = match event.parsed_type() {
            GatewayEventType::CheckoutSessionCompleted => {
                self.handle_checkout_completed(&event).await?
            }
            GatewayEventType::SubscriptionUpdated => {
                self.handle_subscription_updated(&event).await?
            }
            GatewayEventType::SubscriptionDeleted => {
                self.handle_subscription_deleted(&event).await?
            }
            GatewayEventType::InvoicePaid => self.handle_invoice_paid(&event).await?,
            GatewayEventType::Unknown => Outcome::Dropped("unhandled event type".to_string()),
        };

        // 4. Commit the dedupe record; first writer wins under racing
        //    deliveries of the same event.
        let payload = serde_json::from_slice(&cmd.payload).unwrap_or(serde_json::Value::Null);
        let (record, result) = match outcome {
            Outcome::Applied(result) => (
                WebhookEventRecord::success(event.id.as_str(), event.event_type.as_str(), payload),
                result,
            ),
            Outcome::Dropped(reason) => (
                WebhookEventRecord::ignored(
                    event.id.as_str(),
                    event.event_type.as_str(),
                    reason,
                    payload,
                ),
                HandleGatewayWebhookResult::Ignored,
            ),
        };
        match self.events.save(record).await.map_err(storage)? {
            SaveResult::Inserted => Ok(result),
            SaveResult::AlreadyExists => Ok(HandleGatewayWebhookResult::AlreadyProcessed),
        }
    }

    async fn handle_checkout_completed(
        &self,
        event: &GatewayEvent,
    ) -> Result<Outcome, WebhookError> {
        let session: CheckoutSessionObject = event.deserialize_object().map_err(parse)?;
        let gateway_subscription_id = session
            .subscription
            .ok_or(WebhookError::MissingField("subscription"))?;
        let gateway_customer_id = session
            .customer
            .ok_or(WebhookError::MissingField("customer"))?;

        let Some(found) = self
            .subscriptions
            .find_by_checkout_session(&session.id)
            .await
            .map_err(storage)?
        else {
            warn!(checkout_session_id = %session.id, "confirmation for unknown checkout session");
            return Ok(Outcome::Dropped("unknown checkout session".to_string()));
        };

        let _guard = self.locks.acquire(&found.id.to_string()).await;
        let mut subscription = self.reload(found.id).await?;

        if subscription.status == SubscriptionStatus::Canceled {
            warn!(
                subscription_id = %subscription.id,
                checkout_session_id = %session.id,
                "confirmation arrived after abandonment sweep"
            );
            return Ok(Outcome::Dropped(
                "confirmation after abandonment sweep".to_string(),
            ));
        }

        // Program drives trial terms; a program deactivated mid-checkout
        // still honors the paid confirmation but gets flagged.
        let program = self
            .programs
            .get(subscription.program_id)
            .await
            .map_err(storage)?;
        let (active_program, trial_days) = match &program {
            Some(p) => (p.active, p.trial.effective_days()),
            None => (false, None),
        };

        let now = Timestamp::now();
        let (status, trial_end) = match trial_days {
            Some(days) => (
                SubscriptionStatus::Trialing,
                Some(now.add_days(days as i64)),
            ),
            None => (SubscriptionStatus::Active, None),
        };

        match subscription.confirm(
            gateway_subscription_id,
            gateway_customer_id,
            status,
            Some(now),
            None,
            trial_end,
        ) {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Dropped("already confirmed".to_string())),
            Err(err) => return Err(WebhookError::InvalidTransition(err.to_string())),
        }

        // Checkout normally holds the reservation; recover it if this row
        // arrived without one. A full program still honors the paid
        // confirmation, flagged and without a slot, so the counter keeps
        // matching actual slot-holders.
        if !subscription.slot_held {
            match self.programs.reserve_slot(subscription.program_id).await {
                Ok(SlotReservation::Reserved) => subscription.mark_slot_held(),
                Ok(SlotReservation::Full) => {
                    warn!(
                        subscription_id = %subscription.id,
                        program_id = %subscription.program_id,
                        "confirmed without a reservation on a full program; flagged for review"
                    );
                    subscription.flag_for_review();
                }
                Err(err) => {
                    warn!(
                        subscription_id = %subscription.id,
                        program_id = %subscription.program_id,
                        error = %err,
                        "late slot reservation failed; flagged for review"
                    );
                    subscription.flag_for_review();
                }
            }
        }

        if !active_program {
            warn!(
                subscription_id = %subscription.id,
                program_id = %subscription.program_id,
                "confirmed against an inactive or missing program; flagged for review"
            );
            subscription.flag_for_review();
        }

        self.subscriptions
            .save(subscription.clone())
            .await
            .map_err(storage)?;

        info!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            "subscription confirmed"
        );

        // Billing is committed; everything past this point is best-effort.
        if let Some(channel_id) = self.provisioner.provision(&subscription).await {
            subscription.set_channel_id(channel_id);
            if let Err(err) = self.subscriptions.save(subscription.clone()).await {
                warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "failed to persist channel id"
                );
            }
        }

        Ok(Outcome::Applied(
            HandleGatewayWebhookResult::SubscriptionConfirmed {
                subscription_id: subscription.id,
            },
        ))
    }

    async fn handle_subscription_updated(
        &self,
        event: &GatewayEvent,
    ) -> Result<Outcome, WebhookError> {
        let object: SubscriptionObject = event.deserialize_object().map_err(parse)?;

        let Some(found) = self
            .subscriptions
            .find_by_gateway_subscription(&object.id)
            .await
            .map_err(storage)?
        else {
            warn!(gateway_subscription_id = %object.id, "update for unknown subscription");
            return Ok(Outcome::Dropped("unknown subscription reference".to_string()));
        };

        let Some(status) = snapshot_status(&object.status) else {
            // Terminal gateway statuses arrive as a deletion event; a
            // snapshot carrying one is not ours to apply.
            return Ok(Outcome::Dropped(format!(
                "non-billable snapshot status: {}",
                object.status
            )));
        };

        let _guard = self.locks.acquire(&found.id.to_string()).await;
        let mut subscription = self.reload(found.id).await?;

        match subscription.apply_status_snapshot(
            status,
            object.current_period_start.map(Timestamp::from_unix_secs),
            object.current_period_end.map(Timestamp::from_unix_secs),
            object.cancel_at_period_end,
            object.trial_end.map(Timestamp::from_unix_secs),
        ) {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Dropped("snapshot after cancellation".to_string())),
            Err(err) => return Err(WebhookError::InvalidTransition(err.to_string())),
        }

        self.subscriptions
            .save(subscription.clone())
            .await
            .map_err(storage)?;

        info!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            "status snapshot applied"
        );

        Ok(Outcome::Applied(HandleGatewayWebhookResult::SnapshotApplied {
            subscription_id: subscription.id,
        }))
    }

    async fn handle_subscription_deleted(
        &self,
        event: &GatewayEvent,
    ) -> Result<Outcome, WebhookError> {
        let object: DeletedSubscriptionObject = event.deserialize_object().map_err(parse)?;

        let Some(found) = self
            .subscriptions
            .find_by_gateway_subscription(&object.id)
            .await
            .map_err(storage)?
        else {
            warn!(gateway_subscription_id = %object.id, "deletion for unknown subscription");
            return Ok(Outcome::Dropped("unknown subscription reference".to_string()));
        };

        let _guard = self.locks.acquire(&found.id.to_string()).await;
        let mut subscription = self.reload(found.id).await?;

        match subscription.cancel() {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Dropped("already canceled".to_string())),
            Err(err) => return Err(WebhookError::InvalidTransition(err.to_string())),
        }
        let release_slot = subscription.take_slot_release();

        // Persist the terminal state before touching the counter: a replay
        // after this save sees Canceled and slot_held=false, so the release
        // below can never run twice for one subscription.
        self.subscriptions
            .save(subscription.clone())
            .await
            .map_err(storage)?;

        if release_slot {
            if let Err(err) = self.programs.release_slot(subscription.program_id).await {
                warn!(
                    program_id = %subscription.program_id,
                    error = %err,
                    "slot release failed; counter is now conservative"
                );
            }
        }

        info!(subscription_id = %subscription.id, "subscription ended");

        if let Some(channel_id) = &subscription.channel_id {
            self.provisioner.archive(channel_id).await;
        }

        Ok(Outcome::Applied(
            HandleGatewayWebhookResult::SubscriptionEnded {
                subscription_id: subscription.id,
            },
        ))
    }

    async fn handle_invoice_paid(&self, event: &GatewayEvent) -> Result<Outcome, WebhookError> {
        let invoice: InvoiceObject = event.deserialize_object().map_err(parse)?;

        let Some(gateway_subscription_id) = invoice.subscription else {
            return Ok(Outcome::Dropped("invoice without subscription".to_string()));
        };

        let Some(found) = self
            .subscriptions
            .find_by_gateway_subscription(&gateway_subscription_id)
            .await
            .map_err(storage)?
        else {
            warn!(gateway_subscription_id = %gateway_subscription_id, "invoice for unknown subscription");
            return Ok(Outcome::Dropped("unknown subscription reference".to_string()));
        };

        let _guard = self.locks.acquire(&found.id.to_string()).await;
        let mut subscription = self.reload(found.id).await?;

        subscription.record_invoice(
            invoice.amount_paid,
            invoice.application_fee_amount.unwrap_or(0),
        );
        self.subscriptions
            .save(subscription.clone())
            .await
            .map_err(storage)?;

        Ok(Outcome::Applied(HandleGatewayWebhookResult::InvoiceRecorded {
            subscription_id: subscription.id,
        }))
    }

    /// Re-reads the row after acquiring its lock; a queued event may have
    /// changed it since the unlocked lookup.
    async fn reload(&self, id: SubscriptionId) -> Result<Subscription, WebhookError> {
        self.subscriptions
            .get(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| WebhookError::Storage(format!("subscription {} disappeared", id)))
    }
}

/// Maps a gateway status string onto a billable local status.
fn snapshot_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "trialing" => Some(SubscriptionStatus::Trialing),
        "active" => Some(SubscriptionStatus::Active),
        "past_due" => Some(SubscriptionStatus::PastDue),
        _ => None,
    }
}

fn storage(err: DomainError) -> WebhookError {
    WebhookError::Storage(err.to_string())
}

fn parse(err: serde_json::Error) -> WebhookError {
    WebhookError::ParseError(err.to_string())
}

/// Fields read from a checkout.session object.
#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    customer: Option<String>,
    subscription: Option<String>,
}

/// Fields read from a subscription object on update events.
#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    #[serde(default)]
    cancel_at_period_end: bool,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    trial_end: Option<i64>,
}

/// Fields read from a subscription object on deletion events.
#[derive(Debug, Deserialize)]
struct DeletedSubscriptionObject {
    id: String,
}

/// Fields read from an invoice object.
#[derive(Debug, Deserialize)]
struct InvoiceObject {
    subscription: Option<String>,
    amount_paid: i64,
    application_fee_amount: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryProgramStore, InMemorySubscriptionStore, InMemoryWebhookEventStore,
    };
    use crate::domain::foundation::{ProgramId, UserId};
    use crate::domain::program::{Program, TrialTerms};
    use crate::domain::subscription::compute_test_signature;
    use crate::ports::{Channel, CreateChannelRequest, MessagingError, MessagingGateway};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const SECRET: &str = "whsec_test_secret";

    // ══════════════════════════════════════════════════════════════
    // Test Fixtures
    // ══════════════════════════════════════════════════════════════

    struct MockMessaging {
        fail: bool,
        created: AtomicU32,
        archived: AtomicU32,
    }

    impl MockMessaging {
        fn new() -> Self {
            Self {
                fail: false,
                created: AtomicU32::new(0),
                archived: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                created: AtomicU32::new(0),
                archived: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MessagingGateway for MockMessaging {
        async fn create_channel(
            &self,
            _request: CreateChannelRequest,
        ) -> Result<Channel, MessagingError> {
            if self.fail {
                return Err(MessagingError::Provider("down".to_string()));
            }
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Channel {
                id: format!("ch_{}", n),
            })
        }

        async fn send_system_message(
            &self,
            _channel_id: &str,
            _text: &str,
        ) -> Result<(), MessagingError> {
            Ok(())
        }

        async fn archive_channel(&self, _channel_id: &str) -> Result<(), MessagingError> {
            if self.fail {
                return Err(MessagingError::Provider("down".to_string()));
            }
            self.archived.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        programs: Arc<InMemoryProgramStore>,
        subscriptions: Arc<InMemorySubscriptionStore>,
        messaging: Arc<MockMessaging>,
        handler: HandleGatewayWebhookHandler,
    }

    async fn fixture(messaging: MockMessaging) -> Fixture {
        let programs = Arc::new(InMemoryProgramStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionStore::new());
        let messaging = Arc::new(messaging);
        let provisioner = Arc::new(ChannelProvisioner::new(
            Arc::clone(&messaging) as Arc<dyn MessagingGateway>,
            Duration::from_secs(5),
        ));
        let handler = HandleGatewayWebhookHandler::new(
            WebhookVerifier::new(SECRET),
            Arc::clone(&programs) as Arc<dyn ProgramStore>,
            Arc::clone(&subscriptions) as Arc<dyn SubscriptionStore>,
            Arc::new(InMemoryWebhookEventStore::new()) as Arc<dyn WebhookEventStore>,
            provisioner,
        );
        Fixture {
            programs,
            subscriptions,
            messaging,
            handler,
        }
    }

    fn signed_command(event_id: &str, event_type: &str, object: serde_json::Value) -> HandleGatewayWebhookCommand {
        let payload = json!({
            "id": event_id,
            "type": event_type,
            "created": chrono::Utc::now().timestamp(),
            "data": { "object": object },
            "livemode": false,
        })
        .to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = compute_test_signature(SECRET, timestamp, &payload);
        HandleGatewayWebhookCommand {
            payload: payload.into_bytes(),
            signature: format!("t={},v1={}", timestamp, signature),
        }
    }

    /// Seeds a program (with one slot taken) and its pending subscription.
    async fn seed_pending(fixture: &Fixture, trial: TrialTerms) -> Subscription {
        let mut program = Program::new(
            ProgramId::new(),
            UserId::new("coach-1").unwrap(),
            "price_basic",
            Some(5),
            trial,
        );
        assert!(program.take_slot());
        let subscription = Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("client-1").unwrap(),
            program.id,
            program.creator_id.clone(),
            "cs_test_1",
        );
        fixture.programs.save(program).await.unwrap();
        fixture.subscriptions.save(subscription.clone()).await.unwrap();
        subscription
    }

    /// Seeds a confirmed Active subscription with a channel.
    async fn seed_active(fixture: &Fixture) -> Subscription {
        let mut subscription = seed_pending(fixture, TrialTerms::none()).await;
        subscription
            .confirm("sub_gw_1", "cus_gw_1", SubscriptionStatus::Active, None, None, None)
            .unwrap();
        subscription.set_channel_id("ch_existing");
        fixture.subscriptions.save(subscription.clone()).await.unwrap();
        subscription
    }

    fn checkout_completed(event_id: &str) -> HandleGatewayWebhookCommand {
        signed_command(
            event_id,
            "checkout.session.completed",
            json!({
                "id": "cs_test_1",
                "customer": "cus_gw_1",
                "subscription": "sub_gw_1",
            }),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Enforcement
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_signature_is_rejected_without_side_effects() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending(&fixture, TrialTerms::none()).await;

        let mut cmd = checkout_completed("evt_1");
        cmd.signature = format!("t={},v1={}", chrono::Utc::now().timestamp(), "a".repeat(64));

        let result = fixture.handler.handle(cmd).await;
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Pending);
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Confirmation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn confirmation_activates_and_provisions_channel() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending(&fixture, TrialTerms::none()).await;

        let result = fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();
        assert_eq!(
            result,
            HandleGatewayWebhookResult::SubscriptionConfirmed {
                subscription_id: subscription.id
            }
        );

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(stored.gateway_subscription_id.as_deref(), Some("sub_gw_1"));
        assert_eq!(stored.channel_id.as_deref(), Some("ch_1"));
        assert!(!stored.needs_review);
        assert_eq!(fixture.messaging.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trial_program_confirms_to_trialing() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending(&fixture, TrialTerms::days(14)).await;

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Trialing);
        assert!(stored.trial_end.is_some());
    }

    #[tokio::test]
    async fn provisioning_failure_does_not_fail_confirmation() {
        let fixture = fixture(MockMessaging::failing()).await;
        let subscription = seed_pending(&fixture, TrialTerms::none()).await;

        let result = fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();
        assert!(matches!(
            result,
            HandleGatewayWebhookResult::SubscriptionConfirmed { .. }
        ));

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.channel_id.is_none());
    }

    #[tokio::test]
    async fn deactivated_program_confirmation_is_honored_but_flagged() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending(&fixture, TrialTerms::none()).await;
        let mut program = fixture.programs.get(subscription.program_id).await.unwrap().unwrap();
        program.deactivate();
        fixture.programs.save(program).await.unwrap();

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.needs_review);
    }

    #[tokio::test]
    async fn confirmation_after_sweep_is_dropped() {
        let fixture = fixture(MockMessaging::new()).await;
        let mut subscription = seed_pending(&fixture, TrialTerms::none()).await;
        subscription.cancel().unwrap();
        subscription.take_slot_release();
        fixture.subscriptions.save(subscription.clone()).await.unwrap();

        let result = fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
    }

    /// Seeds a pending subscription that does not hold a reservation, on a
    /// program with `taken` of its single-digit slots already in use.
    async fn seed_pending_without_slot(fixture: &Fixture, max: u32, taken: u32) -> Subscription {
        let mut program = Program::new(
            ProgramId::new(),
            UserId::new("coach-1").unwrap(),
            "price_basic",
            Some(max),
            TrialTerms::none(),
        );
        for _ in 0..taken {
            assert!(program.take_slot());
        }
        let mut subscription = Subscription::create_pending(
            SubscriptionId::new(),
            UserId::new("client-1").unwrap(),
            program.id,
            program.creator_id.clone(),
            "cs_test_1",
        );
        subscription.take_slot_release();
        fixture.programs.save(program).await.unwrap();
        fixture.subscriptions.save(subscription.clone()).await.unwrap();
        subscription
    }

    #[tokio::test]
    async fn confirmation_without_reservation_recovers_the_slot() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending_without_slot(&fixture, 5, 0).await;

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.slot_held);
        assert!(!stored.needs_review);

        let program = fixture.programs.get(subscription.program_id).await.unwrap().unwrap();
        assert_eq!(program.current_clients, 1);
    }

    #[tokio::test]
    async fn confirmation_on_full_program_without_reservation_is_flagged() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending_without_slot(&fixture, 1, 1).await;

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();

        // Paid confirmation is honored, but without over-counting capacity.
        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(!stored.slot_held);
        assert!(stored.needs_review);

        let program = fixture.programs.get(subscription.program_id).await.unwrap().unwrap();
        assert_eq!(program.current_clients, 1);
    }

    #[tokio::test]
    async fn unknown_checkout_session_is_dropped() {
        let fixture = fixture(MockMessaging::new()).await;
        seed_pending(&fixture, TrialTerms::none()).await;

        let cmd = signed_command(
            "evt_1",
            "checkout.session.completed",
            json!({"id": "cs_other", "customer": "cus_x", "subscription": "sub_x"}),
        );
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotency
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_event_id_is_skipped() {
        let fixture = fixture(MockMessaging::new()).await;
        seed_pending(&fixture, TrialTerms::none()).await;

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();
        let result = fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::AlreadyProcessed);
        assert_eq!(fixture.messaging.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replayed_confirmation_with_new_event_id_is_noop() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_pending(&fixture, TrialTerms::none()).await;

        fixture.handler.handle(checkout_completed("evt_1")).await.unwrap();
        let result = fixture.handler.handle(checkout_completed("evt_2")).await.unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.gateway_subscription_id.as_deref(), Some("sub_gw_1"));
        assert_eq!(fixture.messaging.created.load(Ordering::SeqCst), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Status Snapshots
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_event_overwrites_status_and_periods() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_active(&fixture).await;

        let cmd = signed_command(
            "evt_upd",
            "customer.subscription.updated",
            json!({
                "id": "sub_gw_1",
                "status": "past_due",
                "cancel_at_period_end": true,
                "current_period_start": 1_704_067_200,
                "current_period_end": 1_706_745_600,
                "trial_end": null,
            }),
        );
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(
            result,
            HandleGatewayWebhookResult::SnapshotApplied {
                subscription_id: subscription.id
            }
        );

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::PastDue);
        assert!(stored.cancel_at_period_end);
        assert_eq!(
            stored.current_period_end.map(|t| t.as_unix_secs()),
            Some(1_706_745_600)
        );
    }

    #[tokio::test]
    async fn update_for_unknown_reference_is_dropped() {
        let fixture = fixture(MockMessaging::new()).await;
        seed_active(&fixture).await;

        let cmd = signed_command(
            "evt_upd",
            "customer.subscription.updated",
            json!({"id": "sub_gw_other", "status": "active"}),
        );
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
    }

    // ══════════════════════════════════════════════════════════════
    // Deletion
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deletion_cancels_releases_slot_and_archives_channel() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_active(&fixture).await;

        let cmd = signed_command(
            "evt_del",
            "customer.subscription.deleted",
            json!({"id": "sub_gw_1", "status": "canceled"}),
        );
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(
            result,
            HandleGatewayWebhookResult::SubscriptionEnded {
                subscription_id: subscription.id
            }
        );

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Canceled);
        assert!(!stored.slot_held);

        let program = fixture.programs.get(subscription.program_id).await.unwrap().unwrap();
        assert_eq!(program.current_clients, 0);
        assert_eq!(fixture.messaging.archived.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_deletion_releases_slot_only_once() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_active(&fixture).await;

        // Take a second slot so a double release would be visible.
        fixture.programs.reserve_slot(subscription.program_id).await.unwrap();

        let first = signed_command(
            "evt_del_1",
            "customer.subscription.deleted",
            json!({"id": "sub_gw_1", "status": "canceled"}),
        );
        let second = signed_command(
            "evt_del_2",
            "customer.subscription.deleted",
            json!({"id": "sub_gw_1", "status": "canceled"}),
        );
        fixture.handler.handle(first).await.unwrap();
        let result = fixture.handler.handle(second).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);

        let program = fixture.programs.get(subscription.program_id).await.unwrap().unwrap();
        assert_eq!(program.current_clients, 1);
        assert_eq!(fixture.messaging.archived.load(Ordering::SeqCst), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Invoices
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invoice_paid_accumulates_totals_without_status_change() {
        let fixture = fixture(MockMessaging::new()).await;
        let subscription = seed_active(&fixture).await;

        for (event_id, amount) in [("evt_inv_1", 5000), ("evt_inv_2", 5000)] {
            let cmd = signed_command(
                event_id,
                "invoice.paid",
                json!({
                    "subscription": "sub_gw_1",
                    "amount_paid": amount,
                    "application_fee_amount": 500,
                }),
            );
            fixture.handler.handle(cmd).await.unwrap();
        }

        let stored = fixture.subscriptions.get(subscription.id).await.unwrap().unwrap();
        assert_eq!(stored.total_paid_cents, 10_000);
        assert_eq!(stored.total_platform_fee_cents, 1000);
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_dropped() {
        let fixture = fixture(MockMessaging::new()).await;
        seed_active(&fixture).await;

        let cmd = signed_command(
            "evt_inv",
            "invoice.paid",
            json!({"subscription": null, "amount_paid": 5000}),
        );
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
    }

    // ══════════════════════════════════════════════════════════════
    // Unknown Events
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged_and_ignored() {
        let fixture = fixture(MockMessaging::new()).await;

        let cmd = signed_command("evt_x", "charge.dispute.created", json!({}));
        let result = fixture.handler.handle(cmd).await.unwrap();
        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
    }
}
