//! ProgramStore port - persistence and capacity accounting for programs.
//!
//! ## Why reservation lives here
//!
//! Oversell prevention needs the capacity check and the counter increment to
//! be one atomic step. A read-modify-write through `get`/`save` would race
//! under concurrent checkouts, so the store itself exposes `reserve_slot` and
//! implementations perform it under exclusive access to the row (row lock,
//! conditional UPDATE, or a mutex for the in-memory store).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProgramId};
use crate::domain::program::Program;

/// Outcome of an atomic slot reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotReservation {
    /// A slot was taken; the caller now owes exactly one release.
    Reserved,
    /// The program is at capacity; nothing changed.
    Full,
}

/// Port for program persistence and slot accounting.
#[async_trait]
pub trait ProgramStore: Send + Sync {
    /// Find a program by id.
    async fn get(&self, id: ProgramId) -> Result<Option<Program>, DomainError>;

    /// Insert or update a program.
    async fn save(&self, program: Program) -> Result<(), DomainError>;

    /// Atomically take one slot if capacity allows.
    ///
    /// The check and increment must not interleave with other reservations.
    async fn reserve_slot(&self, id: ProgramId) -> Result<SlotReservation, DomainError>;

    /// Return one slot. Floored at zero by the aggregate.
    async fn release_slot(&self, id: ProgramId) -> Result<(), DomainError>;
}
