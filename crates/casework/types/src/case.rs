//! The case aggregate
//!
//! A `Case` tracks where a licence request sits in the pipeline: its
//! current department and status, who is assigned in each department,
//! each department's deadline, and the history of every applied change.
//!
//! Mutators check their invariants first and append history last, so a
//! failed call leaves the case untouched.

use crate::{
    ActionKind, ActorId, Assignment, CaseError, CaseId, CaseResult, CaseStatus, Deadline,
    Department, HistoryEntry, Inspection, Outcome, Priority, Transition,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Applicant and Project ────────────────────────────────────────────

/// The person who filed the case. Opaque to the workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Applicant {
    pub full_name: String,
    pub national_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// The construction project the licence is requested for. Opaque to the
/// workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Project {
    pub name: String,
    pub address: String,
    pub district: String,
    pub land_area_m2: f64,
    pub built_area_m2: f64,
    pub levels: u32,
    pub intended_use: String,
    pub works_type: String,
}

/// Input for opening a new case
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCase {
    pub applicant: Applicant,
    pub project: Project,
    #[serde(default)]
    pub priority: Priority,
    /// Who registered the case (applicant or intake clerk)
    pub filed_by: ActorId,
}

impl NewCase {
    pub fn new(applicant: Applicant, project: Project, filed_by: ActorId) -> Self {
        Self {
            applicant,
            project,
            priority: Priority::Normal,
            filed_by,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

// ── Financials ───────────────────────────────────────────────────────

/// Licence fee state. Amounts are in minor currency units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Financials {
    pub payment_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<i64>,
    /// Bank operation number from the applicant's voucher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl Financials {
    pub fn new(payment_required: bool) -> Self {
        Self {
            payment_required,
            ..Default::default()
        }
    }

    /// Whether final approval may proceed
    pub fn is_satisfied(&self) -> bool {
        !self.payment_required || self.verified
    }
}

// ── Decision support ─────────────────────────────────────────────────

/// On what grounds an actor takes a decision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAuthority {
    /// Must hold the department's active assignment
    Assigned,
    /// Supervisory role acting for its own department; an implicit
    /// assignment is created when none is held
    Supervisory,
}

/// What a successful decision changed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDecision {
    pub from_status: CaseStatus,
    pub to_status: CaseStatus,
    pub to_department: Department,
    pub handling_minutes: i64,
    /// Approval was recorded but the case waits in PendingPayment
    pub awaiting_payment: bool,
}

// ── Case ─────────────────────────────────────────────────────────────

/// One licence request tracked through the pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub applicant: Applicant,
    pub project: Project,
    pub current_department: Department,
    pub status: CaseStatus,
    pub priority: Priority,
    /// Who registered the case
    pub filed_by: ActorId,
    /// At most one assignment per department; re-entry replaces it
    #[serde(default)]
    pub assignments: BTreeMap<Department, Assignment>,
    #[serde(default)]
    pub deadlines: BTreeMap<Department, Deadline>,
    /// Append-only audit trail
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub financials: Financials,
    /// Site visit of the latest inspection round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<Inspection>,
    /// Reference of the issued licence document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Case {
    /// Open a case in Intake/Registered with the Intake deadline running.
    ///
    /// Registration is recorded by `created_at` and `filed_by`; history
    /// starts empty and only records actions taken on the case.
    pub fn open(
        id: CaseId,
        draft: NewCase,
        payment_required: bool,
        intake_deadline: Deadline,
    ) -> Self {
        let mut case = Self {
            id,
            applicant: draft.applicant,
            project: draft.project,
            current_department: Department::Intake,
            status: CaseStatus::Registered,
            priority: draft.priority,
            filed_by: draft.filed_by,
            assignments: BTreeMap::new(),
            deadlines: BTreeMap::new(),
            history: Vec::new(),
            financials: Financials::new(payment_required),
            inspection: None,
            license_reference: None,
            created_at: intake_deadline.started_at,
        };
        case.deadlines.insert(Department::Intake, intake_deadline);
        case
    }

    // ── Mutators ─────────────────────────────────────────────────────

    /// Put `actor_id` in charge of `department`, start its deadline and
    /// move the case there.
    ///
    /// Routing to another department withdraws the open assignment of the
    /// department being left and drops its deadline.
    pub fn begin_assignment(
        &mut self,
        department: Department,
        actor_id: ActorId,
        assigned_by: &ActorId,
        entry_status: CaseStatus,
        deadline: Deadline,
        priority: Option<Priority>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        if !department.is_active() {
            return Err(CaseError::InvalidTransition(format!(
                "department {} takes no assignments",
                department
            )));
        }
        if entry_status.department() != department {
            return Err(CaseError::InvalidTransition(format!(
                "status {} does not belong to {}",
                entry_status, department
            )));
        }

        let now = deadline.started_at;
        let mut assignment = Assignment::new(actor_id.clone(), now);
        assignment.start();

        let from_status = self.status;
        let mut note = format!("assigned to {}", actor_id);
        let left = self.current_department;
        if left != department {
            if let Some(withdrawn) = self.assignments.get_mut(&left).filter(|a| a.is_active()) {
                withdrawn.withdraw(now);
                note.push_str(&format!(
                    "; {} assignment of {} withdrawn",
                    left, withdrawn.actor_id
                ));
            }
            self.deadlines.remove(&left);
        }

        self.assignments.insert(department, assignment);
        self.deadlines.insert(department, deadline);
        self.current_department = department;
        self.status = entry_status;
        if let Some(priority) = priority {
            self.priority = priority;
        }

        self.append_history(
            HistoryEntry::new(
                ActionKind::Assigned,
                assigned_by.clone(),
                department,
                from_status,
                entry_status,
                now,
            )
            .with_note(Some(note)),
        );
        Ok(())
    }

    /// Apply a decision by `actor_id` following `transition`.
    ///
    /// A final approval while payment is unsettled is recorded but parks
    /// the case in `PendingPayment`. A rollback clears the stale
    /// assignment and deadline of the department returned to.
    pub fn record_decision(
        &mut self,
        actor_id: &ActorId,
        transition: &Transition,
        authority: DecisionAuthority,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> CaseResult<AppliedDecision> {
        self.ensure_open()?;
        let department = transition.department;
        if department != self.current_department {
            return Err(CaseError::InvalidTransition(format!(
                "case {} is in {}, not {}",
                self.id, self.current_department, department
            )));
        }
        let note = normalize_note(note);
        if transition.outcome.requires_note() && note.is_none() {
            return Err(CaseError::MissingNote(transition.outcome));
        }

        let mut assignment = self.resolve_assignment(department, actor_id, authority, now)?;
        assignment.start();
        let handling_minutes = assignment.complete(transition.outcome, now).unwrap_or(0);

        let awaiting_payment = transition.requires_payment && !self.financials.is_satisfied();
        let (to_department, to_status) = if awaiting_payment {
            (Department::Management, CaseStatus::PendingPayment)
        } else {
            (transition.next_department, transition.next_status)
        };

        let from_status = self.status;
        if department == Department::Inspection {
            if let Some(visit) = self.inspection.as_mut() {
                visit.complete(transition.outcome, note.clone(), now);
            }
        }
        self.assignments.insert(department, assignment);
        if transition.is_rollback() {
            self.assignments.remove(&transition.next_department);
            self.deadlines.remove(&transition.next_department);
        }
        self.current_department = to_department;
        self.status = to_status;

        self.append_history(
            HistoryEntry::new(
                ActionKind::Decision,
                actor_id.clone(),
                department,
                from_status,
                to_status,
                now,
            )
            .with_note(note)
            .with_decision(transition.outcome, handling_minutes),
        );

        Ok(AppliedDecision {
            from_status,
            to_status,
            to_department,
            handling_minutes,
            awaiting_payment,
        })
    }

    /// The applicant answered observations: back to Intake/Registered
    /// with a fresh Intake deadline.
    pub fn resubmit(
        &mut self,
        actor_id: &ActorId,
        note: Option<String>,
        intake_deadline: Deadline,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        if !self.status.is_observed() {
            return Err(CaseError::InvalidTransition(format!(
                "case {} has no pending observations (status {})",
                self.id, self.status
            )));
        }

        let now = intake_deadline.started_at;
        let from_status = self.status;
        self.assignments.remove(&Department::Intake);
        self.deadlines.insert(Department::Intake, intake_deadline);
        self.current_department = Department::Intake;
        self.status = CaseStatus::Registered;

        self.append_history(
            HistoryEntry::new(
                ActionKind::Resubmitted,
                actor_id.clone(),
                Department::Intake,
                from_status,
                CaseStatus::Registered,
                now,
            )
            .with_note(normalize_note(note)),
        );
        Ok(())
    }

    pub fn change_priority(
        &mut self,
        actor_id: &ActorId,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        if self.priority == priority {
            return Err(CaseError::InvalidInput(format!(
                "case {} already has priority {}",
                self.id, priority
            )));
        }
        let previous = self.priority;
        self.priority = priority;
        self.append_unchanged_status(
            ActionKind::PriorityChanged,
            actor_id,
            Some(format!("{} -> {}", previous, priority)),
            now,
        );
        Ok(())
    }

    /// Set the licence fee. Moves the case to `PendingPayment`.
    pub fn set_payment_amount(
        &mut self,
        actor_id: &ActorId,
        amount_minor: i64,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        if amount_minor <= 0 {
            return Err(CaseError::InvalidInput(format!(
                "payment amount must be positive, got {}",
                amount_minor
            )));
        }
        if self.current_department != Department::Management {
            return Err(CaseError::InvalidTransition(format!(
                "payment is set in management, case {} is in {}",
                self.id, self.current_department
            )));
        }
        if self.financials.verified {
            return Err(CaseError::InvalidTransition(format!(
                "payment for case {} is already verified",
                self.id
            )));
        }

        let from_status = self.status;
        self.financials.payment_required = true;
        self.financials.amount_minor = Some(amount_minor);
        self.financials.operation_number = None;
        self.financials.paid_at = None;
        self.status = CaseStatus::PendingPayment;

        self.append_history(
            HistoryEntry::new(
                ActionKind::PaymentAmountSet,
                actor_id.clone(),
                Department::Management,
                from_status,
                CaseStatus::PendingPayment,
                now,
            )
            .with_note(Some(format!("amount {}", amount_minor))),
        );
        Ok(())
    }

    /// Record the applicant's payment voucher
    pub fn record_payment(
        &mut self,
        actor_id: &ActorId,
        operation_number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        let operation_number = operation_number.into().trim().to_string();
        if operation_number.is_empty() {
            return Err(CaseError::InvalidInput(
                "operation number must not be empty".to_string(),
            ));
        }
        if self.status != CaseStatus::PendingPayment || self.financials.amount_minor.is_none() {
            return Err(CaseError::InvalidTransition(format!(
                "case {} is not awaiting a payment",
                self.id
            )));
        }

        self.financials.operation_number = Some(operation_number.clone());
        self.financials.paid_at = Some(now);
        self.append_unchanged_status(
            ActionKind::PaymentRecorded,
            actor_id,
            Some(format!("operation {}", operation_number)),
            now,
        );
        Ok(())
    }

    /// Refuse the recorded voucher. The case stays in `PendingPayment`
    /// and the applicant must record the payment again.
    pub fn reject_payment(
        &mut self,
        actor_id: &ActorId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        let reason = normalize_note(reason).ok_or_else(|| {
            CaseError::InvalidInput("a rejected payment needs a reason".to_string())
        })?;
        if self.status != CaseStatus::PendingPayment || self.financials.paid_at.is_none() {
            return Err(CaseError::InvalidTransition(format!(
                "case {} has no recorded payment to reject",
                self.id
            )));
        }

        self.financials.operation_number = None;
        self.financials.paid_at = None;
        self.append_unchanged_status(ActionKind::PaymentRejected, actor_id, Some(reason), now);
        Ok(())
    }

    /// `PendingPayment` → `PaymentVerified`
    pub fn verify_payment(&mut self, actor_id: &ActorId, now: DateTime<Utc>) -> CaseResult<()> {
        self.ensure_open()?;
        if self.status != CaseStatus::PendingPayment || self.financials.paid_at.is_none() {
            return Err(CaseError::InvalidTransition(format!(
                "case {} has no recorded payment to verify",
                self.id
            )));
        }

        self.financials.verified = true;
        self.status = CaseStatus::PaymentVerified;
        self.append_history(HistoryEntry::new(
            ActionKind::PaymentVerified,
            actor_id.clone(),
            Department::Management,
            CaseStatus::PendingPayment,
            CaseStatus::PaymentVerified,
            now,
        ));
        Ok(())
    }

    /// Book the site visit for the current inspection round. The inspector
    /// is the holder of the open Inspection assignment.
    pub fn schedule_inspection(
        &mut self,
        actor_id: &ActorId,
        authority: DecisionAuthority,
        scheduled_for: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        self.ensure_open()?;
        if self.status != CaseStatus::InspectionScheduled {
            return Err(CaseError::InvalidTransition(format!(
                "inspections are booked in inspection, case {} is {}",
                self.id, self.status
            )));
        }
        if scheduled_for < now {
            return Err(CaseError::InvalidInput(format!(
                "inspection date {} is in the past",
                scheduled_for
            )));
        }
        let inspector = match self.active_assignment(Department::Inspection) {
            Some(a) if a.is_held_by(actor_id) || authority == DecisionAuthority::Supervisory => {
                a.actor_id.clone()
            }
            _ => {
                return Err(CaseError::NoActiveAssignment {
                    actor_id: actor_id.clone(),
                    department: Department::Inspection,
                })
            }
        };

        self.inspection = Some(Inspection::new(inspector.clone(), scheduled_for, now));
        self.append_unchanged_status(
            ActionKind::InspectionScheduled,
            actor_id,
            Some(format!("visit on {} by {}", scheduled_for, inspector)),
            now,
        );
        Ok(())
    }

    /// `Approved` → `LicenseIssued`, once the licence document exists
    pub fn record_license_issued(
        &mut self,
        actor_id: &ActorId,
        reference: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        match self.status {
            CaseStatus::Approved => {}
            status if status.is_terminal() => return Err(CaseError::TerminalCase(self.id.clone())),
            status => {
                return Err(CaseError::InvalidTransition(format!(
                    "licence can only be issued for approved cases, case {} is {}",
                    self.id, status
                )))
            }
        }

        let reference = reference.into();
        self.license_reference = Some(reference.clone());
        self.status = CaseStatus::LicenseIssued;
        self.append_history(
            HistoryEntry::new(
                ActionKind::LicenseIssued,
                actor_id.clone(),
                Department::Finalized,
                CaseStatus::Approved,
                CaseStatus::LicenseIssued,
                now,
            )
            .with_note(Some(reference)),
        );
        Ok(())
    }

    /// File a finalized case
    pub fn archive(
        &mut self,
        actor_id: &ActorId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> CaseResult<()> {
        if self.current_department == Department::Archived {
            return Err(CaseError::TerminalCase(self.id.clone()));
        }
        if self.current_department != Department::Finalized {
            return Err(CaseError::InvalidTransition(format!(
                "only finalized cases can be archived, case {} is in {}",
                self.id, self.current_department
            )));
        }

        let from_status = self.status;
        self.current_department = Department::Archived;
        self.status = CaseStatus::Archived;
        self.append_history(
            HistoryEntry::new(
                ActionKind::Archived,
                actor_id.clone(),
                Department::Archived,
                from_status,
                CaseStatus::Archived,
                now,
            )
            .with_note(normalize_note(note)),
        );
        Ok(())
    }

    /// Recompute every deadline's overdue flag against `now`.
    ///
    /// Returns the departments whose flag went from false to true.
    pub fn recompute_overdue(&mut self, now: DateTime<Utc>) -> Vec<Department> {
        let mut newly_overdue = Vec::new();
        for (department, deadline) in self.deadlines.iter_mut() {
            let overdue = deadline.compute_overdue(self.assignments.get(department), now);
            if overdue && !deadline.is_overdue {
                newly_overdue.push(*department);
            }
            deadline.is_overdue = overdue;
        }
        newly_overdue
    }

    /// Append a history entry, assigning its sequence number
    pub fn append_history(&mut self, mut entry: HistoryEntry) {
        entry.sequence = self.history.len() as u64;
        self.history.push(entry);
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Finalized or archived
    pub fn is_terminal(&self) -> bool {
        self.current_department.is_terminal()
    }

    pub fn assignment(&self, department: Department) -> Option<&Assignment> {
        self.assignments.get(&department)
    }

    /// The open assignment of a department, if any
    pub fn active_assignment(&self, department: Department) -> Option<&Assignment> {
        self.assignments
            .get(&department)
            .filter(|a| a.is_active())
    }

    pub fn deadline(&self, department: Department) -> Option<&Deadline> {
        self.deadlines.get(&department)
    }

    /// Any deadline currently flagged overdue
    pub fn has_overdue_deadline(&self) -> bool {
        self.deadlines.values().any(|d| d.is_overdue)
    }

    /// Whether `actor_id` holds an assignment on this case or decided on it
    pub fn involves_actor(&self, actor_id: &ActorId) -> bool {
        self.assignments.values().any(|a| a.is_held_by(actor_id))
            || self
                .history
                .iter()
                .any(|h| &h.actor_id == actor_id && h.kind == ActionKind::Decision)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_history(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_open(&self) -> CaseResult<()> {
        if self.is_terminal() {
            return Err(CaseError::TerminalCase(self.id.clone()));
        }
        Ok(())
    }

    /// Find the assignment a decision closes, or create the implicit one
    /// for a supervisory actor.
    fn resolve_assignment(
        &self,
        department: Department,
        actor_id: &ActorId,
        authority: DecisionAuthority,
        now: DateTime<Utc>,
    ) -> CaseResult<Assignment> {
        let existing = self.assignments.get(&department);
        match (existing, authority) {
            (Some(a), _) if a.is_active() && a.is_held_by(actor_id) => Ok(a.clone()),
            (Some(a), DecisionAuthority::Supervisory) if a.is_active() => {
                // supervisor takes over an open assignment; timing runs from the original start
                Ok(Assignment::new(actor_id.clone(), a.assigned_at))
            }
            (_, DecisionAuthority::Supervisory) => Ok(Assignment::new(actor_id.clone(), now)),
            (Some(a), DecisionAuthority::Assigned) if a.is_held_by(actor_id) => {
                Err(CaseError::StaleAssignment {
                    actor_id: actor_id.clone(),
                    department,
                })
            }
            _ => Err(CaseError::NoActiveAssignment {
                actor_id: actor_id.clone(),
                department,
            }),
        }
    }

    fn append_unchanged_status(
        &mut self,
        kind: ActionKind,
        actor_id: &ActorId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) {
        let entry = HistoryEntry::new(
            kind,
            actor_id.clone(),
            self.current_department,
            self.status,
            self.status,
            now,
        )
        .with_note(note);
        self.append_history(entry);
    }
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
