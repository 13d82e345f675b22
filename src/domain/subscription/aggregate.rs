//! Subscription aggregate entity.
//!
//! # Design Decisions
//!
//! - **Single writer**: after confirmation, only the webhook reconciler
//!   mutates authoritative fields; the one exception is the
//!   `cancel_at_period_end` intent flag.
//! - **Explicit reservation flag**: `slot_held` records whether this row holds
//!   one unit of program capacity. It is never derived from status, so
//!   duplicate cancellation events cannot double-release and duplicate
//!   confirmations cannot double-count.
//! - **Money in cents**: cumulative totals stored as i64 cents.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ProgramId, StateMachine, SubscriptionId, Timestamp, UserId,
};

use super::{BillingError, SubscriptionStatus};

/// Subscription aggregate - one (client, program) purchase attempt.
///
/// # Invariants
///
/// - `checkout_session_id` is unique: the confirmation idempotency key maps
///   1:1 to at most one row.
/// - Status transitions follow the state machine in `status.rs`.
/// - `slot_held` flips true at most once per row via reservation, and false
///   at most once via [`Subscription::take_slot_release`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// Client paying for the program.
    pub client_id: UserId,

    /// Program being purchased.
    pub program_id: ProgramId,

    /// Creator who owns the program.
    pub creator_id: UserId,

    /// Current status in the billing lifecycle.
    pub status: SubscriptionStatus,

    /// Gateway checkout session id; confirmation idempotency key.
    pub checkout_session_id: String,

    /// Gateway subscription id; set by the first confirmation event.
    pub gateway_subscription_id: Option<String>,

    /// Gateway customer id; set by the first confirmation event.
    pub gateway_customer_id: Option<String>,

    /// When the trial ends, if one is running.
    pub trial_end: Option<Timestamp>,

    /// Start of the current billing period.
    pub current_period_start: Option<Timestamp>,

    /// End of the current billing period.
    pub current_period_end: Option<Timestamp>,

    /// Cancellation intent: end the subscription when the period closes.
    pub cancel_at_period_end: bool,

    /// Messaging channel provisioned for this coaching relationship.
    pub channel_id: Option<String>,

    /// Whether this row currently holds one unit of program capacity.
    pub slot_held: bool,

    /// Flagged for operator review (paid but anomalous activation).
    pub needs_review: bool,

    /// Cumulative amount the client has paid, in cents.
    pub total_paid_cents: i64,

    /// Cumulative platform fee collected, in cents.
    pub total_platform_fee_cents: i64,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,

    /// When the subscription was canceled (if canceled).
    pub canceled_at: Option<Timestamp>,
}

impl Subscription {
    /// Creates the provisional row written at checkout initiation.
    ///
    /// The row starts `Pending` and holds the capacity reservation taken
    /// immediately before the gateway call.
    pub fn create_pending(
        id: SubscriptionId,
        client_id: UserId,
        program_id: ProgramId,
        creator_id: UserId,
        checkout_session_id: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            client_id,
            program_id,
            creator_id,
            status: SubscriptionStatus::Pending,
            checkout_session_id: checkout_session_id.into(),
            gateway_subscription_id: None,
            gateway_customer_id: None,
            trial_end: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            channel_id: None,
            slot_held: true,
            needs_review: false,
            total_paid_cents: 0,
            total_platform_fee_cents: 0,
            created_at: now,
            updated_at: now,
            canceled_at: None,
        }
    }

    /// True if the first confirmation event has been applied.
    pub fn is_confirmed(&self) -> bool {
        self.gateway_subscription_id.is_some()
    }

    /// Whether this subscription currently grants program access.
    pub fn has_access(&self) -> bool {
        self.status.has_access()
    }

    /// Applies the first confirmation event for this checkout.
    ///
    /// Returns `Ok(true)` when the confirmation was applied, `Ok(false)` when
    /// this subscription was already confirmed (duplicate delivery, no-op).
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the row is `Canceled` (e.g. swept as abandoned
    ///   before the event arrived) or the reported status is not billable.
    pub fn confirm(
        &mut self,
        gateway_subscription_id: impl Into<String>,
        gateway_customer_id: impl Into<String>,
        status: SubscriptionStatus,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
        trial_end: Option<Timestamp>,
    ) -> Result<bool, BillingError> {
        if self.is_confirmed() {
            return Ok(false);
        }
        if !matches!(
            status,
            SubscriptionStatus::Trialing | SubscriptionStatus::Active
        ) {
            return Err(BillingError::invalid_state(
                format!("{:?}", self.status),
                format!("confirm as {:?}", status),
            ));
        }
        self.transition_to(status)?;
        self.gateway_subscription_id = Some(gateway_subscription_id.into());
        self.gateway_customer_id = Some(gateway_customer_id.into());
        self.current_period_start = period_start;
        self.current_period_end = period_end;
        self.trial_end = trial_end;
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// Overwrites status and period fields from a gateway snapshot.
    ///
    /// Last-event-wins: the snapshot carries the processor's current
    /// authoritative state, so replays converge without extra bookkeeping.
    /// Returns `Ok(false)` without touching the row when it is already
    /// `Canceled` (late update after deletion).
    pub fn apply_status_snapshot(
        &mut self,
        status: SubscriptionStatus,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
        cancel_at_period_end: bool,
        trial_end: Option<Timestamp>,
    ) -> Result<bool, BillingError> {
        if self.status == SubscriptionStatus::Canceled {
            return Ok(false);
        }
        if !status.is_billable() {
            return Err(BillingError::invalid_state(
                format!("{:?}", self.status),
                format!("snapshot {:?}", status),
            ));
        }
        self.transition_to(status)?;
        if period_start.is_some() {
            self.current_period_start = period_start;
        }
        if period_end.is_some() {
            self.current_period_end = period_end;
        }
        self.cancel_at_period_end = cancel_at_period_end;
        self.trial_end = trial_end;
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// Transitions to `Canceled`.
    ///
    /// Returns `Ok(false)` if already canceled (duplicate deletion event).
    pub fn cancel(&mut self) -> Result<bool, BillingError> {
        if self.status == SubscriptionStatus::Canceled {
            return Ok(false);
        }
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.canceled_at = Some(Timestamp::now());
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// Takes the slot release exactly once.
    ///
    /// Returns true the first time it is called while a slot is held; every
    /// later call returns false. Callers release program capacity only on a
    /// true return, which makes duplicate deletion events and repeated sweep
    /// runs safe.
    pub fn take_slot_release(&mut self) -> bool {
        if self.slot_held {
            self.slot_held = false;
            self.updated_at = Timestamp::now();
            true
        } else {
            false
        }
    }

    /// Records a late reservation taken by the reconciler.
    pub fn mark_slot_held(&mut self) {
        self.slot_held = true;
        self.updated_at = Timestamp::now();
    }

    /// Records the local cancellation intent. The status itself is only
    /// changed by the reconciler when the deletion event arrives.
    pub fn set_cancel_at_period_end(&mut self, value: bool) {
        self.cancel_at_period_end = value;
        self.updated_at = Timestamp::now();
    }

    /// Accumulates totals from an invoice-paid event. Never changes status.
    pub fn record_invoice(&mut self, amount_paid_cents: i64, platform_fee_cents: i64) {
        self.total_paid_cents += amount_paid_cents;
        self.total_platform_fee_cents += platform_fee_cents;
        self.updated_at = Timestamp::now();
    }

    /// Stores the provisioned messaging channel id.
    pub fn set_channel_id(&mut self, channel_id: impl Into<String>) {
        self.channel_id = Some(channel_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Flags this subscription for operator review.
    pub fn flag_for_review(&mut self) {
        self.needs_review = true;
        self.updated_at = Timestamp::now();
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), BillingError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            BillingError::invalid_state(format!("{:?}", self.status), format!("{:?}", target))
        })?;
        Ok(())
    }
}
