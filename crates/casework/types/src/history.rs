//! Append-only case history
//!
//! History is the audit trail and the only source of timing metrics.
//! Entries are never edited or removed.

use crate::{ActorId, CaseStatus, Department, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of action produced a history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Assigned,
    Decision,
    Resubmitted,
    PriorityChanged,
    PaymentAmountSet,
    PaymentRecorded,
    PaymentRejected,
    PaymentVerified,
    InspectionScheduled,
    LicenseIssued,
    Archived,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One applied change to a case
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in the history, starting at 0
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub actor_id: ActorId,
    pub kind: ActionKind,
    pub from_status: CaseStatus,
    pub to_status: CaseStatus,
    /// Department the action was taken for
    pub department: Department,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Set on decision entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Set on decision entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handling_minutes: Option<i64>,
}

impl HistoryEntry {
    pub fn new(
        kind: ActionKind,
        actor_id: ActorId,
        department: Department,
        from_status: CaseStatus,
        to_status: CaseStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sequence: 0,
            timestamp,
            actor_id,
            kind,
            from_status,
            to_status,
            department,
            note: None,
            outcome: None,
            handling_minutes: None,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    pub fn with_decision(mut self, outcome: Outcome, handling_minutes: i64) -> Self {
        self.outcome = Some(outcome);
        self.handling_minutes = Some(handling_minutes);
        self
    }

    /// A decision that completed its assignment as Done
    pub fn is_completed_decision(&self) -> bool {
        self.kind == ActionKind::Decision
            && self.outcome.map(|o| o.completes_assignment()).unwrap_or(false)
    }
}
