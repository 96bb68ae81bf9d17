//! Error types for case operations

use crate::{ActorId, CaseId, Department, Outcome, Role};

/// Errors returned by case operations. Each one is a rejected operation
/// on a single case; nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseError {
    #[error("Case not found: {0}")]
    NotFound(CaseId),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Role mismatch: actor '{actor_id}' holds none of {required:?}")]
    RoleMismatch {
        actor_id: ActorId,
        required: Vec<Role>,
    },

    #[error("No active assignment for actor '{actor_id}' in {department}")]
    NoActiveAssignment {
        actor_id: ActorId,
        department: Department,
    },

    #[error("Assignment of actor '{actor_id}' in {department} is already closed")]
    StaleAssignment {
        actor_id: ActorId,
        department: Department,
    },

    #[error(
        "Concurrent modification of case {case_id}: expected version {expected}, found {found}"
    )]
    ConcurrentModification {
        case_id: CaseId,
        expected: u64,
        found: u64,
    },

    #[error("A note is required for outcome {0}")]
    MissingNote(Outcome),

    #[error("Case is terminal: {0}")]
    TerminalCase(CaseId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl CaseError {
    /// Whether a fresh read and a retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result type alias for case operations
pub type CaseResult<T> = Result<T, CaseError>;
