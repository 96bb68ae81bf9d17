//! Case store abstraction
//!
//! One authoritative store holds every case together with a version
//! counter. Writes name the version they were computed from; a write
//! against a version that moved on fails with
//! [`StoreError::VersionConflict`] and persists nothing.

use async_trait::async_trait;
use casework_types::{Case, CaseError, CaseId};
use thiserror::Error;

/// Monotonic per-case revision, starting at 1 on insert
pub type Version = u64;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("case not found: {0}")]
    NotFound(CaseId),

    #[error("version conflict on case {case_id}: expected {expected}, found {found}")]
    VersionConflict {
        case_id: CaseId,
        expected: Version,
        found: Version,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CaseError::NotFound(id),
            StoreError::VersionConflict {
                case_id,
                expected,
                found,
            } => CaseError::ConcurrentModification {
                case_id,
                expected,
                found,
            },
            other => CaseError::Store(other.to_string()),
        }
    }
}

/// Storage interface for cases
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Read a case and the version it was read at.
    async fn load_case(&self, case_id: &CaseId) -> StoreResult<(Case, Version)>;

    /// Replace a case if its stored version still equals `expected_version`.
    /// Returns the new version.
    async fn save_case(&self, case: &Case, expected_version: Version) -> StoreResult<Version>;

    /// Insert a new case. Fails with `Conflict` if the id exists.
    async fn insert_case(&self, case: &Case) -> StoreResult<Version>;

    /// Every stored case with its version.
    async fn list_cases(&self) -> StoreResult<Vec<(Case, Version)>>;

    /// Issue the next case sequence number for `year`, starting at 1.
    async fn next_case_number(&self, year: i32) -> StoreResult<u64>;
}
