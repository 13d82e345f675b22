//! Program-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, ProgramId};

/// Errors raised by program lookups and capacity accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// Program does not exist.
    NotFound(ProgramId),

    /// Program exists but is not accepting new clients.
    Inactive(ProgramId),

    /// Program is at its client capacity.
    CapacityExceeded(ProgramId),

    /// Infrastructure error from the backing store.
    Infrastructure(String),
}

impl ProgramError {
    pub fn not_found(id: ProgramId) -> Self {
        ProgramError::NotFound(id)
    }

    pub fn inactive(id: ProgramId) -> Self {
        ProgramError::Inactive(id)
    }

    pub fn capacity_exceeded(id: ProgramId) -> Self {
        ProgramError::CapacityExceeded(id)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ProgramError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProgramError::NotFound(_) => ErrorCode::ProgramNotFound,
            ProgramError::Inactive(_) => ErrorCode::ProgramInactive,
            ProgramError::CapacityExceeded(_) => ErrorCode::CapacityExceeded,
            ProgramError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::NotFound(id) => write!(f, "Program not found: {}", id),
            ProgramError::Inactive(id) => write!(f, "Program {} is inactive", id),
            ProgramError::CapacityExceeded(id) => {
                write!(f, "Program {} has no open client slots", id)
            }
            ProgramError::Infrastructure(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ProgramError {}

impl From<ProgramError> for DomainError {
    fn from(err: ProgramError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
