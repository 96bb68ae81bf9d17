//! Stage graph: the fixed rails a case runs on
//!
//! Keyed by `(department, outcome)`. Four departments own a decision.
//! Each can advance or send back, except Management, whose outcomes are
//! the final approval and the permanent rejection. Intake's return stays
//! in Intake awaiting resubmission; every other return goes back one
//! department.

use casework_types::{CaseStatus, Department, Outcome, Role, Transition};

const fn row(
    department: Department,
    outcome: Outcome,
    next_department: Department,
    next_status: CaseStatus,
    required_role: Role,
    requires_payment: bool,
) -> Transition {
    Transition {
        department,
        outcome,
        next_department,
        next_status,
        required_role,
        requires_payment,
    }
}

const TRANSITIONS: [Transition; 8] = [
    row(
        Department::Intake,
        Outcome::Accept,
        Department::TechnicalReview,
        CaseStatus::TechnicalReview,
        Role::IntakeClerk,
        false,
    ),
    row(
        Department::Intake,
        Outcome::Return,
        Department::Intake,
        CaseStatus::IncompleteDocuments,
        Role::IntakeClerk,
        false,
    ),
    row(
        Department::TechnicalReview,
        Outcome::Accept,
        Department::Inspection,
        CaseStatus::InspectionScheduled,
        Role::TechnicalReviewer,
        false,
    ),
    row(
        Department::TechnicalReview,
        Outcome::Return,
        Department::Intake,
        CaseStatus::TechnicalReviewObserved,
        Role::TechnicalReviewer,
        false,
    ),
    row(
        Department::Inspection,
        Outcome::Accept,
        Department::Management,
        CaseStatus::ManagementReview,
        Role::Inspector,
        false,
    ),
    row(
        Department::Inspection,
        Outcome::Return,
        Department::TechnicalReview,
        CaseStatus::InspectionObserved,
        Role::Inspector,
        false,
    ),
    row(
        Department::Management,
        Outcome::Approve,
        Department::Finalized,
        CaseStatus::Approved,
        Role::Manager,
        true,
    ),
    row(
        Department::Management,
        Outcome::Reject,
        Department::Finalized,
        CaseStatus::Rejected,
        Role::Manager,
        false,
    ),
];

/// Read-only lookups over the transition table
#[derive(Clone, Copy, Debug, Default)]
pub struct StageGraph;

impl StageGraph {
    /// Every row of the graph
    pub fn transitions() -> &'static [Transition] {
        &TRANSITIONS
    }

    /// The transition for a department's decision, if the outcome exists there
    pub fn transition(department: Department, outcome: Outcome) -> Option<Transition> {
        TRANSITIONS
            .iter()
            .find(|t| t.department == department && t.outcome == outcome)
            .copied()
    }

    /// Outcomes available to a department
    pub fn outcomes(department: Department) -> Vec<Outcome> {
        TRANSITIONS
            .iter()
            .filter(|t| t.department == department)
            .map(|t| t.outcome)
            .collect()
    }

    /// Role an assignee of `department` must hold
    pub fn required_role(department: Department) -> Option<Role> {
        match department {
            Department::Intake => Some(Role::IntakeClerk),
            Department::TechnicalReview => Some(Role::TechnicalReviewer),
            Department::Inspection => Some(Role::Inspector),
            Department::Management => Some(Role::Manager),
            Department::Finalized | Department::Archived => None,
        }
    }

    /// Status a case takes when an actor is assigned to `department`
    pub fn entry_status(department: Department) -> Option<CaseStatus> {
        match department {
            Department::Intake => Some(CaseStatus::DocumentVerification),
            Department::TechnicalReview => Some(CaseStatus::TechnicalReview),
            Department::Inspection => Some(CaseStatus::InspectionScheduled),
            Department::Management => Some(CaseStatus::ManagementReview),
            Department::Finalized | Department::Archived => None,
        }
    }

    /// Whether `outcome` may be decided while the case sits in `status`.
    ///
    /// Cases awaiting the applicant (incomplete documents) need a
    /// resubmission first. Approval waits for payment verification once
    /// the case is in `PendingPayment`; rejection does not.
    pub fn is_decidable(department: Department, status: CaseStatus, outcome: Outcome) -> bool {
        if status.department() != department {
            return false;
        }
        match status {
            CaseStatus::IncompleteDocuments => false,
            CaseStatus::PendingPayment => outcome == Outcome::Reject,
            s => !s.is_terminal(),
        }
    }
}
