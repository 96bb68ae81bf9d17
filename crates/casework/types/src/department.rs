//! Departments, statuses and priorities
//!
//! `Department` is the coarse position of a case in the pipeline and
//! `CaseStatus` the finer state inside it. Every status belongs to
//! exactly one department, see [`CaseStatus::department`].

use serde::{Deserialize, Serialize};

// ── Department ───────────────────────────────────────────────────────

/// A processing unit a case passes through
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Department {
    /// Front desk: registration and document verification
    #[default]
    Intake,
    /// Technical review of plans and documents
    TechnicalReview,
    /// On-site inspection
    Inspection,
    /// Final management decision and payment
    Management,
    /// Decision taken; approved, rejected or licence issued
    Finalized,
    /// Closed and filed
    Archived,
}

impl Department {
    /// The departments that own a decision, in pipeline order
    pub const ACTIVE: [Department; 4] = [
        Department::Intake,
        Department::TechnicalReview,
        Department::Inspection,
        Department::Management,
    ];

    /// Check if this is a terminal department
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Archived)
    }

    /// Check if this department owns a decision
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Intake => "intake",
            Self::TechnicalReview => "technical_review",
            Self::Inspection => "inspection",
            Self::Management => "management",
            Self::Finalized => "finalized",
            Self::Archived => "archived",
        };
        write!(f, "{}", name)
    }
}

// ── Case Status ──────────────────────────────────────────────────────

/// Fine-grained case state, meaningful relative to its department
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseStatus {
    // Intake
    Registered,
    DocumentVerification,
    IncompleteDocuments,
    TechnicalReviewObserved,
    // TechnicalReview
    TechnicalReview,
    InspectionObserved,
    // Inspection
    InspectionScheduled,
    // Management
    ManagementReview,
    PendingPayment,
    PaymentVerified,
    // Finalized
    Approved,
    Rejected,
    LicenseIssued,
    // Archived
    Archived,
}

impl CaseStatus {
    /// The department this status belongs to
    pub fn department(&self) -> Department {
        match self {
            Self::Registered
            | Self::DocumentVerification
            | Self::IncompleteDocuments
            | Self::TechnicalReviewObserved => Department::Intake,
            Self::TechnicalReview | Self::InspectionObserved => Department::TechnicalReview,
            Self::InspectionScheduled => Department::Inspection,
            Self::ManagementReview | Self::PendingPayment | Self::PaymentVerified => {
                Department::Management
            }
            Self::Approved | Self::Rejected | Self::LicenseIssued => Department::Finalized,
            Self::Archived => Department::Archived,
        }
    }

    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        self.department().is_terminal()
    }

    /// Statuses that record a department sending the case back
    pub fn is_observed(&self) -> bool {
        matches!(
            self,
            Self::IncompleteDocuments | Self::TechnicalReviewObserved | Self::InspectionObserved
        )
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ── Priority ─────────────────────────────────────────────────────────

/// Case priority, set at creation and changed by supervisory roles
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_maps_to_one_department() {
        assert_eq!(CaseStatus::Registered.department(), Department::Intake);
        assert_eq!(
            CaseStatus::TechnicalReviewObserved.department(),
            Department::Intake
        );
        assert_eq!(
            CaseStatus::InspectionObserved.department(),
            Department::TechnicalReview
        );
        assert_eq!(
            CaseStatus::PaymentVerified.department(),
            Department::Management
        );
        assert_eq!(CaseStatus::LicenseIssued.department(), Department::Finalized);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CaseStatus::Approved.is_terminal());
        assert!(CaseStatus::Rejected.is_terminal());
        assert!(CaseStatus::Archived.is_terminal());
        assert!(!CaseStatus::PendingPayment.is_terminal());
    }

    #[test]
    fn test_active_departments_in_pipeline_order() {
        assert_eq!(Department::ACTIVE[0], Department::Intake);
        assert_eq!(Department::ACTIVE[3], Department::Management);
        assert!(Department::ACTIVE.iter().all(|d| d.is_active()));
    }

    #[test]
    fn test_priority_default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
        assert!(Priority::Urgent > Priority::Low);
    }
}
