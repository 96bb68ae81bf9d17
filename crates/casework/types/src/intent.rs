//! Side-effect intents
//!
//! The engine never sends mail or renders documents. Each successful
//! operation returns intents describing what should happen next, and
//! the caller forwards them to the notifier or the artifact generator.

use crate::{ActorId, CaseId, Department, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the applicant is being told
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicantNotice {
    Registered,
    Decision {
        department: Department,
        outcome: Outcome,
    },
    PaymentDue {
        amount_minor: i64,
    },
    /// The voucher was refused; the note carries the reason
    PaymentRejected,
    PaymentVerified,
    InspectionScheduled {
        scheduled_for: DateTime<Utc>,
    },
    LicenseIssued,
}

/// A deadline that went overdue during a sweep
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAlert {
    pub case_id: CaseId,
    pub department: Department,
    pub due_at: DateTime<Utc>,
    /// Officer holding the open assignment, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
}

/// A side effect for an external collaborator to perform
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Tell an officer a case was assigned to them
    NotifyActor {
        actor_id: ActorId,
        case_id: CaseId,
        department: Department,
    },
    /// Tell the applicant about progress on their case
    NotifyApplicant {
        case_id: CaseId,
        notice: ApplicantNotice,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// Tell every officer of a department that a case needs attention
    NotifyDepartment {
        case_id: CaseId,
        department: Department,
    },
    OverdueAlert(OverdueAlert),
    /// Render the licence document for an approved case
    GenerateLicenseArtifact { case_id: CaseId },
    /// Approval is parked until a payment amount is set and verified
    PaymentAmountRequired { case_id: CaseId },
}

impl Intent {
    pub fn case_id(&self) -> &CaseId {
        match self {
            Self::NotifyActor { case_id, .. }
            | Self::NotifyApplicant { case_id, .. }
            | Self::NotifyDepartment { case_id, .. }
            | Self::GenerateLicenseArtifact { case_id }
            | Self::PaymentAmountRequired { case_id } => case_id,
            Self::OverdueAlert(alert) => &alert.case_id,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotifyActor { .. } => "notify_actor",
            Self::NotifyApplicant { .. } => "notify_applicant",
            Self::NotifyDepartment { .. } => "notify_department",
            Self::OverdueAlert(_) => "overdue_alert",
            Self::GenerateLicenseArtifact { .. } => "generate_license_artifact",
            Self::PaymentAmountRequired { .. } => "payment_amount_required",
        }
    }
}

impl From<OverdueAlert> for Intent {
    fn from(alert: OverdueAlert) -> Self {
        Self::OverdueAlert(alert)
    }
}
