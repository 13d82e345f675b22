//! Subscription status state machine.
//!
//! Gateway status-update events carry the processor's current authoritative
//! status (a snapshot, not a delta), so the machine permits movement in any
//! direction between the three billable states: replays and out-of-order
//! deliveries then converge on the latest snapshot without special cases.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Provisional row created at checkout initiation. Not billable; holds a
    /// capacity reservation until confirmed or swept.
    Pending,

    /// Confirmed, inside a free trial period.
    Trialing,

    /// Confirmed and paid.
    Active,

    /// Payment failed; gateway is retrying. Access continues during grace.
    PastDue,

    /// Ended. Terminal: a new purchase creates a new Subscription.
    Canceled,
}

impl SubscriptionStatus {
    /// Statuses that grant the client access to the program.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trialing | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }

    /// Statuses that block a new checkout for the same (client, program).
    ///
    /// Includes `Pending`: a provisional row already holds the reservation.
    pub fn blocks_new_checkout(&self) -> bool {
        !matches!(self, SubscriptionStatus::Canceled)
    }

    /// Statuses a gateway snapshot may legitimately report for a live
    /// subscription.
    pub fn is_billable(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trialing | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        match (self, target) {
            // From PENDING: first confirmation, or abandonment sweep
            (Pending, Trialing) | (Pending, Active) | (Pending, Canceled) => true,
            // Billable states move freely among themselves (snapshot overwrite)
            // and into the terminal state
            (Trialing | Active | PastDue, Trialing | Active | PastDue | Canceled) => true,
            // CANCELED is terminal
            _ => false,
        }
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Trialing, Active, Canceled],
            Trialing | Active | PastDue => vec![Trialing, Active, PastDue, Canceled],
            Canceled => vec![],
        }
    }
}
