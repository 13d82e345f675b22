//! In-memory ProgramStore.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, ProgramId};
use crate::domain::program::Program;
use crate::ports::program_store::{ProgramStore, SlotReservation};

/// Map-backed program store.
///
/// The write lock makes `reserve_slot` atomic: the capacity check and the
/// counter increment happen under one exclusive section.
#[derive(Default)]
pub struct InMemoryProgramStore {
    programs: Arc<RwLock<HashMap<ProgramId, Program>>>,
}

impl InMemoryProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a program, returning the store for chaining in test setup.
    pub async fn with_program(self, program: Program) -> Self {
        self.programs.write().await.insert(program.id, program);
        self
    }

    /// Audit helper: overwrite the counter with a recount of slots actually
    /// held. Returns true if the stored counter had drifted.
    pub async fn recount(&self, id: ProgramId, slots_held: u32) -> Result<bool, DomainError> {
        let mut programs = self.programs.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or_else(|| DomainError::new(ErrorCode::ProgramNotFound, format!("program {}", id)))?;
        let drifted = program.current_clients != slots_held;
        program.current_clients = slots_held;
        Ok(drifted)
    }
}

#[async_trait]
impl ProgramStore for InMemoryProgramStore {
    async fn get(&self, id: ProgramId) -> Result<Option<Program>, DomainError> {
        Ok(self.programs.read().await.get(&id).cloned())
    }

    async fn save(&self, program: Program) -> Result<(), DomainError> {
        self.programs.write().await.insert(program.id, program);
        Ok(())
    }

    async fn reserve_slot(&self, id: ProgramId) -> Result<SlotReservation, DomainError> {
        let mut programs = self.programs.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or_else(|| DomainError::new(ErrorCode::ProgramNotFound, format!("program {}", id)))?;
        if program.take_slot() {
            Ok(SlotReservation::Reserved)
        } else {
            Ok(SlotReservation::Full)
        }
    }

    async fn release_slot(&self, id: ProgramId) -> Result<(), DomainError> {
        let mut programs = self.programs.write().await;
        let program = programs
            .get_mut(&id)
            .ok_or_else(|| DomainError::new(ErrorCode::ProgramNotFound, format!("program {}", id)))?;
        program.return_slot();
        Ok(())
    }
}
