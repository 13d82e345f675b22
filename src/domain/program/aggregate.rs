//! Program aggregate entity.
//!
//! # Invariants
//!
//! - `current_clients` equals the number of subscriptions on this program
//!   currently holding a slot. Every transition that takes or returns a slot
//!   adjusts the counter in the same store operation; the arithmetic here is
//!   only ever invoked by a store while it holds exclusive access to the row.
//! - `current_clients <= max_clients` when a capacity is set; `take_slot`
//!   refuses to exceed it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProgramId, Timestamp, UserId};

/// Trial terms attached to a program's checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialTerms {
    /// Whether new subscriptions start with a free trial.
    pub enabled: bool,

    /// Trial length in days; ignored when `enabled` is false.
    pub days: u32,
}

impl TrialTerms {
    /// No trial.
    pub fn none() -> Self {
        Self {
            enabled: false,
            days: 0,
        }
    }

    /// Trial of the given number of days.
    pub fn days(days: u32) -> Self {
        Self {
            enabled: days > 0,
            days,
        }
    }

    /// Trial days to send to the gateway, if any.
    pub fn effective_days(&self) -> Option<u32> {
        if self.enabled && self.days > 0 {
            Some(self.days)
        } else {
            None
        }
    }
}

/// Program aggregate - a creator's recurring offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Unique identifier for this program.
    pub id: ProgramId,

    /// Creator who owns and sells this program.
    pub creator_id: UserId,

    /// Price reference at the payment gateway.
    pub gateway_price_id: String,

    /// Maximum concurrent clients; None means unlimited.
    pub max_clients: Option<u32>,

    /// Clients currently holding a slot. Maintained, never recomputed.
    pub current_clients: u32,

    /// Whether the program accepts new checkouts.
    pub active: bool,

    /// Trial terms for new subscriptions.
    pub trial: TrialTerms,

    /// When the program was created.
    pub created_at: Timestamp,

    /// When the program was last updated.
    pub updated_at: Timestamp,
}

impl Program {
    /// Creates a new active program with no clients.
    pub fn new(
        id: ProgramId,
        creator_id: UserId,
        gateway_price_id: impl Into<String>,
        max_clients: Option<u32>,
        trial: TrialTerms,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            creator_id,
            gateway_price_id: gateway_price_id.into(),
            max_clients,
            current_clients: 0,
            active: true,
            trial,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if at least one slot is open.
    pub fn has_capacity(&self) -> bool {
        match self.max_clients {
            Some(max) => self.current_clients < max,
            None => true,
        }
    }

    /// Takes one slot if capacity allows.
    ///
    /// Returns false, leaving the counter untouched, when the program is full.
    /// Must only be called by a store holding exclusive access to this row;
    /// the check and the increment must be observed as a single step.
    pub fn take_slot(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.current_clients += 1;
        self.updated_at = Timestamp::now();
        true
    }

    /// Returns one slot, floored at zero.
    pub fn return_slot(&mut self) {
        self.current_clients = self.current_clients.saturating_sub(1);
        self.updated_at = Timestamp::now();
    }

    /// Marks the program closed to new checkouts.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_program(max_clients: Option<u32>) -> Program {
        Program::new(
            ProgramId::new(),
            UserId::new("coach-1").unwrap(),
            "price_basic",
            max_clients,
            TrialTerms::none(),
        )
    }

    #[test]
    fn new_program_is_active_and_empty() {
        let program = test_program(Some(10));
        assert!(program.active);
        assert_eq!(program.current_clients, 0);
        assert!(program.has_capacity());
    }

    #[test]
    fn take_slot_increments_until_full() {
        let mut program = test_program(Some(2));
        assert!(program.take_slot());
        assert!(program.take_slot());
        assert!(!program.take_slot());
        assert_eq!(program.current_clients, 2);
    }

    #[test]
    fn unlimited_program_always_has_capacity() {
        let mut program = test_program(None);
        for _ in 0..1000 {
            assert!(program.take_slot());
        }
        assert!(program.has_capacity());
    }

    #[test]
    fn return_slot_floors_at_zero() {
        let mut program = test_program(Some(5));
        program.return_slot();
        assert_eq!(program.current_clients, 0);

        assert!(program.take_slot());
        program.return_slot();
        assert_eq!(program.current_clients, 0);
    }

    #[test]
    fn trial_terms_effective_days() {
        assert_eq!(TrialTerms::none().effective_days(), None);
        assert_eq!(TrialTerms::days(0).effective_days(), None);
        assert_eq!(TrialTerms::days(14).effective_days(), Some(14));
    }

    #[test]
    fn deactivate_closes_program() {
        let mut program = test_program(None);
        program.deactivate();
        assert!(!program.active);
    }
}
