//! Roles, decision outcomes and stage transitions

use crate::{CaseStatus, Department};
use serde::{Deserialize, Serialize};

// ── Role ─────────────────────────────────────────────────────────────

/// A role an actor may hold in the organisation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Front-desk clerk; decides for Intake and may force-route cases
    IntakeClerk,
    TechnicalReviewer,
    Inspector,
    /// Management; decides final approval and may force-route cases
    Manager,
    /// The person who filed the case
    Applicant,
}

impl Role {
    /// Supervisory roles may decide for their own department without a
    /// prior assignment and may assign outside the current department.
    pub fn is_supervisory(&self) -> bool {
        matches!(self, Self::IntakeClerk | Self::Manager)
    }

    /// Roles allowed to create assignments
    pub fn can_assign(&self) -> bool {
        matches!(
            self,
            Self::IntakeClerk | Self::Manager | Self::TechnicalReviewer
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ── Outcome ──────────────────────────────────────────────────────────

/// Result of a department's decision on a case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    /// Advance to the next department
    Accept,
    /// Send back with observations
    Return,
    /// Final approval (Management only)
    Approve,
    /// Permanent rejection (Management only)
    Reject,
}

impl Outcome {
    /// Return and Reject must carry a note
    pub fn requires_note(&self) -> bool {
        matches!(self, Self::Return | Self::Reject)
    }

    /// Whether the decision completes the assignment as Done
    /// rather than Returned
    pub fn completes_assignment(&self) -> bool {
        !matches!(self, Self::Return)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ── Transition ───────────────────────────────────────────────────────

/// One row of the stage graph: `(department, outcome) -> next position`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub department: Department,
    pub outcome: Outcome,
    pub next_department: Department,
    pub next_status: CaseStatus,
    /// Role an actor must hold to take this decision
    pub required_role: Role,
    /// Final approval is only reachable once payment is verified
    pub requires_payment: bool,
}

impl Transition {
    /// Whether the case leaves the deciding department backwards
    pub fn is_rollback(&self) -> bool {
        self.outcome == Outcome::Return && self.next_department != self.department
    }
}
