//! Case Engine: the entry point for every case operation
//!
//! Each operation follows the same shape:
//! 1. Load the case and the version it was read at
//! 2. Check preconditions against the stage graph and the role directory
//! 3. Apply the change through the case's own mutators
//! 4. Save under the version guard
//! 5. Return the result and the intents the caller should dispatch
//!
//! **The engine never performs side effects.** It does not send mail,
//! render licences or retry. A save that lost a race comes back as
//! `ConcurrentModification` and the caller decides whether to retry
//! with a fresh read.

use crate::calendar::{BusinessCalendar, Clock, SystemClock};
use crate::config::EngineConfig;
use crate::roles::RoleDirectory;
use crate::stage_graph::StageGraph;
use crate::statistics::{ActorStatistics, CaseFilter, StatisticsAggregator, StatisticsSnapshot};
use crate::store::{CaseStore, Version};
use crate::sweeper;
use casework_types::*;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Requests and Results ─────────────────────────────────────────────

/// Put an officer in charge of a department's decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRequest {
    pub case_id: CaseId,
    pub department: Department,
    pub actor_id: ActorId,
    /// Role the assignee acts under; must be the department's role
    pub actor_role: Role,
    /// Who is making the assignment
    pub assigned_by: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl AssignRequest {
    pub fn new(
        case_id: CaseId,
        department: Department,
        actor_id: ActorId,
        actor_role: Role,
        assigned_by: ActorId,
    ) -> Self {
        Self {
            case_id,
            department,
            actor_id,
            actor_role,
            assigned_by,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub case_id: CaseId,
    pub department: Department,
    pub actor_id: ActorId,
    pub status: CaseStatus,
    pub due_at: DateTime<Utc>,
    pub version: Version,
}

/// Record a department's decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideRequest {
    pub case_id: CaseId,
    pub department: Department,
    pub actor_id: ActorId,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DecideRequest {
    pub fn new(
        case_id: CaseId,
        department: Department,
        actor_id: ActorId,
        outcome: Outcome,
    ) -> Self {
        Self {
            case_id,
            department,
            actor_id,
            outcome,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub case_id: CaseId,
    pub department: Department,
    pub outcome: Outcome,
    pub from_status: CaseStatus,
    pub to_status: CaseStatus,
    pub next_department: Department,
    pub handling_minutes: i64,
    /// Approval recorded, case waits in PendingPayment
    pub awaiting_payment: bool,
    pub version: Version,
}

/// Result of the bookkeeping operations (priority, payment, licence, archive)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseUpdate {
    pub case_id: CaseId,
    pub department: Department,
    pub status: CaseStatus,
    pub version: Version,
}

impl CaseUpdate {
    fn of(case: &Case, version: Version) -> Self {
        Self {
            case_id: case.id.clone(),
            department: case.current_department,
            status: case.status,
            version,
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// The case workflow engine
#[derive(Clone)]
pub struct CaseEngine {
    store: Arc<dyn CaseStore>,
    roles: Arc<dyn RoleDirectory>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
    statistics: StatisticsAggregator,
    config: EngineConfig,
}

impl CaseEngine {
    pub fn new(
        store: Arc<dyn CaseStore>,
        roles: Arc<dyn RoleDirectory>,
        config: EngineConfig,
    ) -> Self {
        let calendar = BusinessCalendar::new().with_holidays(config.holidays.iter().copied());
        Self {
            store,
            roles,
            clock: Arc::new(SystemClock),
            calendar,
            statistics: StatisticsAggregator::new(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Case Lifecycle ───────────────────────────────────────────────

    /// Register a new case in Intake with its deadline running
    pub async fn create_case(&self, draft: NewCase) -> CaseResult<(Case, Vec<Intent>)> {
        let now = self.clock.now();
        let sequence = self.store.next_case_number(now.year()).await?;
        let case_id = CaseId::from_sequence(&self.config.case_number_prefix, now.year(), sequence);

        let case = Case::open(
            case_id.clone(),
            draft,
            self.config.payment_required,
            self.start_deadline(Department::Intake, now),
        );
        self.store.insert_case(&case).await?;

        tracing::info!(case_id = %case_id, priority = %case.priority, "Case registered");

        let intents = vec![Intent::NotifyApplicant {
            case_id,
            notice: ApplicantNotice::Registered,
            note: None,
        }];
        Ok((case, intents))
    }

    /// Read a case
    pub async fn get_case(&self, case_id: &CaseId) -> CaseResult<Case> {
        Ok(self.store.load_case(case_id).await?.0)
    }

    // ── Assignment ───────────────────────────────────────────────────

    /// Assign an officer to a department and start its deadline.
    ///
    /// The department must be the case's current one unless the assigner
    /// holds a supervisory role, which may force-route the case.
    pub async fn assign(
        &self,
        request: AssignRequest,
    ) -> CaseResult<(AssignmentResult, Vec<Intent>)> {
        let (mut case, version) = self.store.load_case(&request.case_id).await?;
        if case.is_terminal() {
            return Err(CaseError::TerminalCase(case.id));
        }

        let department = request.department;
        let (required, entry_status) = StageGraph::required_role(department)
            .zip(StageGraph::entry_status(department))
            .ok_or_else(|| {
                CaseError::InvalidTransition(format!(
                    "department {} takes no assignments",
                    department
                ))
            })?;

        if request.actor_role != required
            || !self.roles.has_role(&request.actor_id, required).await?
        {
            return Err(CaseError::RoleMismatch {
                actor_id: request.actor_id,
                required: vec![required],
            });
        }

        let assigner_roles = self.roles.roles_of(&request.assigned_by).await?;
        if !assigner_roles.iter().any(Role::can_assign) {
            return Err(CaseError::RoleMismatch {
                actor_id: request.assigned_by,
                required: vec![Role::IntakeClerk, Role::TechnicalReviewer, Role::Manager],
            });
        }
        if department != case.current_department
            && !assigner_roles.iter().any(Role::is_supervisory)
        {
            return Err(CaseError::InvalidTransition(format!(
                "cannot assign {} while case {} is in {}",
                department, case.id, case.current_department
            )));
        }

        // reassignment in place keeps payment progress; documents owed by
        // the applicant come back through resubmission only
        let entry_status = match case.status {
            CaseStatus::IncompleteDocuments if department == case.current_department => {
                return Err(CaseError::InvalidTransition(format!(
                    "case {} awaits resubmission by the applicant",
                    case.id
                )));
            }
            CaseStatus::PendingPayment | CaseStatus::PaymentVerified
                if department == case.current_department =>
            {
                case.status
            }
            _ => entry_status,
        };

        let now = self.clock.now();
        let deadline = self.start_deadline(department, now);
        let due_at = deadline.due_at;
        case.begin_assignment(
            department,
            request.actor_id.clone(),
            &request.assigned_by,
            entry_status,
            deadline,
            request.priority,
        )?;
        let version = self.persist(&case, version).await?;

        tracing::info!(
            case_id = %case.id,
            department = %department,
            actor_id = %request.actor_id,
            due_at = %due_at,
            "Case assigned"
        );

        let intents = vec![Intent::NotifyActor {
            actor_id: request.actor_id.clone(),
            case_id: case.id.clone(),
            department,
        }];
        let result = AssignmentResult {
            case_id: case.id,
            department,
            actor_id: request.actor_id,
            status: entry_status,
            due_at,
            version,
        };
        Ok((result, intents))
    }

    // ── Decisions ────────────────────────────────────────────────────

    /// Apply a department's decision and move the case along the stage graph.
    pub async fn decide(
        &self,
        request: DecideRequest,
    ) -> CaseResult<(DecisionResult, Vec<Intent>)> {
        let (mut case, version) = self.store.load_case(&request.case_id).await?;
        if case.is_terminal() {
            return Err(CaseError::TerminalCase(case.id));
        }

        let department = request.department;
        let transition = StageGraph::transition(department, request.outcome).ok_or_else(|| {
            CaseError::InvalidTransition(format!(
                "outcome {} is not available in {}",
                request.outcome, department
            ))
        })?;
        if department != case.current_department {
            return Err(CaseError::InvalidTransition(format!(
                "case {} is in {}, not {}",
                case.id, case.current_department, department
            )));
        }
        if !StageGraph::is_decidable(department, case.status, request.outcome) {
            return Err(CaseError::InvalidTransition(format!(
                "outcome {} cannot be decided while case {} is {}",
                request.outcome, case.id, case.status
            )));
        }

        if !self
            .roles
            .has_role(&request.actor_id, transition.required_role)
            .await?
        {
            return Err(CaseError::RoleMismatch {
                actor_id: request.actor_id,
                required: vec![transition.required_role],
            });
        }
        let authority = if transition.required_role.is_supervisory() {
            DecisionAuthority::Supervisory
        } else {
            DecisionAuthority::Assigned
        };

        let now = self.clock.now();
        let applied = case.record_decision(
            &request.actor_id,
            &transition,
            authority,
            request.note.clone(),
            now,
        )?;
        let version = self.persist(&case, version).await?;

        tracing::info!(
            case_id = %case.id,
            department = %department,
            outcome = %request.outcome,
            from = %applied.from_status,
            to = %applied.to_status,
            handling_minutes = applied.handling_minutes,
            "Decision applied"
        );

        let mut intents = Vec::new();
        if applied.awaiting_payment && case.financials.amount_minor.is_none() {
            intents.push(Intent::PaymentAmountRequired {
                case_id: case.id.clone(),
            });
        }
        if applied.to_status == CaseStatus::Approved {
            intents.push(Intent::GenerateLicenseArtifact {
                case_id: case.id.clone(),
            });
        }
        intents.push(Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::Decision {
                department,
                outcome: request.outcome,
            },
            note: case.last_history().and_then(|h| h.note.clone()),
        });

        let result = DecisionResult {
            case_id: case.id,
            department,
            outcome: request.outcome,
            from_status: applied.from_status,
            to_status: applied.to_status,
            next_department: applied.to_department,
            handling_minutes: applied.handling_minutes,
            awaiting_payment: applied.awaiting_payment,
            version,
        };
        Ok((result, intents))
    }

    /// The applicant answered observations; the case restarts in Intake
    /// and every intake clerk is told. Only the filer or a supervisory
    /// role may resubmit.
    pub async fn resubmit(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        note: Option<String>,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        let (mut case, version) = self.store.load_case(case_id).await?;
        self.require_filer_or_supervisor(&case, actor_id).await?;
        let now = self.clock.now();
        case.resubmit(actor_id, note, self.start_deadline(Department::Intake, now))?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, "Case resubmitted");

        let intents = vec![Intent::NotifyDepartment {
            case_id: case.id.clone(),
            department: Department::Intake,
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    // ── Supervisory Bookkeeping ──────────────────────────────────────

    /// Change a case's priority. Supervisory roles only.
    pub async fn change_priority(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        priority: Priority,
    ) -> CaseResult<CaseUpdate> {
        self.require_any(actor_id, &[Role::IntakeClerk, Role::Manager])
            .await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.change_priority(actor_id, priority, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, priority = %priority, "Priority changed");
        Ok(CaseUpdate::of(&case, version))
    }

    /// Set the licence fee; the case waits in PendingPayment.
    pub async fn set_payment_amount(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        amount_minor: i64,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        self.require_any(actor_id, &[Role::IntakeClerk, Role::Manager])
            .await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.set_payment_amount(actor_id, amount_minor, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, amount_minor, "Payment amount set");

        let intents = vec![Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::PaymentDue { amount_minor },
            note: None,
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    /// Record the applicant's payment voucher. Only the filer or a
    /// supervisory role may record it.
    pub async fn record_payment(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        operation_number: &str,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        let (mut case, version) = self.store.load_case(case_id).await?;
        self.require_filer_or_supervisor(&case, actor_id).await?;
        case.record_payment(actor_id, operation_number, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, "Payment recorded");

        let intents = vec![Intent::NotifyDepartment {
            case_id: case.id.clone(),
            department: Department::Management,
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    /// Confirm the recorded payment. Supervisory roles only.
    pub async fn verify_payment(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        self.require_any(actor_id, &[Role::IntakeClerk, Role::Manager])
            .await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.verify_payment(actor_id, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, "Payment verified");

        let intents = vec![Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::PaymentVerified,
            note: None,
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    /// Refuse the recorded voucher with a reason. Supervisory roles only.
    pub async fn reject_payment(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        reason: &str,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        self.require_any(actor_id, &[Role::IntakeClerk, Role::Manager])
            .await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.reject_payment(actor_id, Some(reason.to_string()), self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, "Payment rejected");

        let intents = vec![Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::PaymentRejected,
            note: case.last_history().and_then(|h| h.note.clone()),
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Book the site visit. The assigned inspector books their own visit;
    /// a manager may book on their behalf.
    pub async fn schedule_inspection(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        scheduled_for: DateTime<Utc>,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        let held = self.roles.roles_of(actor_id).await?;
        let authority = if held.contains(&Role::Manager) {
            DecisionAuthority::Supervisory
        } else if held.contains(&Role::Inspector) {
            DecisionAuthority::Assigned
        } else {
            return Err(CaseError::RoleMismatch {
                actor_id: actor_id.clone(),
                required: vec![Role::Inspector, Role::Manager],
            });
        };

        let (mut case, version) = self.store.load_case(case_id).await?;
        case.schedule_inspection(actor_id, authority, scheduled_for, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, scheduled_for = %scheduled_for, "Inspection scheduled");

        let intents = vec![Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::InspectionScheduled { scheduled_for },
            note: None,
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    // ── Finalized Cases ──────────────────────────────────────────────

    /// Acknowledge the generated licence: Approved → LicenseIssued
    pub async fn record_license_issued(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        reference: &str,
    ) -> CaseResult<(CaseUpdate, Vec<Intent>)> {
        self.require_any(actor_id, &[Role::Manager]).await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.record_license_issued(actor_id, reference, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, reference, "Licence issued");

        let intents = vec![Intent::NotifyApplicant {
            case_id: case.id.clone(),
            notice: ApplicantNotice::LicenseIssued,
            note: Some(reference.to_string()),
        }];
        Ok((CaseUpdate::of(&case, version), intents))
    }

    /// File a finalized case. Manager only.
    pub async fn archive(
        &self,
        case_id: &CaseId,
        actor_id: &ActorId,
        note: Option<String>,
    ) -> CaseResult<CaseUpdate> {
        self.require_any(actor_id, &[Role::Manager]).await?;
        let (mut case, version) = self.store.load_case(case_id).await?;
        case.archive(actor_id, note, self.clock.now())?;
        let version = self.persist(&case, version).await?;

        tracing::info!(case_id = %case.id, "Case archived");
        Ok(CaseUpdate::of(&case, version))
    }

    // ── Deadlines and Statistics ─────────────────────────────────────

    /// Flag overdue deadlines as of `now`; see [`crate::sweeper`].
    pub async fn sweep(&self, now: DateTime<Utc>) -> CaseResult<Vec<OverdueAlert>> {
        sweeper::sweep(self.store.as_ref(), now).await
    }

    /// Figures over the cases matching `filter`
    pub async fn aggregate(&self, filter: &CaseFilter) -> CaseResult<StatisticsSnapshot> {
        let cases = self.store.list_cases().await?;
        Ok(self
            .statistics
            .compute(cases.iter().map(|(case, _)| case), filter))
    }

    /// Workload figures for one officer
    pub async fn actor_statistics(&self, actor_id: &ActorId) -> CaseResult<ActorStatistics> {
        let cases = self.store.list_cases().await?;
        Ok(self
            .statistics
            .actor_statistics(cases.iter().map(|(case, _)| case), actor_id))
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn persist(&self, case: &Case, expected: Version) -> CaseResult<Version> {
        let version = self.store.save_case(case, expected).await?;
        if let Some(entry) = case.last_history() {
            tracing::trace!(
                case_id = %case.id,
                sequence = entry.sequence,
                kind = %entry.kind,
                version,
                "History appended"
            );
        }
        Ok(version)
    }

    fn start_deadline(&self, department: Department, now: DateTime<Utc>) -> Deadline {
        let days = self.config.deadlines.business_days(department);
        Deadline::new(now, self.calendar.due_date(now, days), days)
    }

    /// The person who filed the case, or anyone holding a supervisory role
    async fn require_filer_or_supervisor(&self, case: &Case, actor_id: &ActorId) -> CaseResult<()> {
        if &case.filed_by == actor_id {
            return Ok(());
        }
        let held = self.roles.roles_of(actor_id).await?;
        if held.iter().any(Role::is_supervisory) {
            Ok(())
        } else {
            Err(CaseError::RoleMismatch {
                actor_id: actor_id.clone(),
                required: vec![Role::Applicant, Role::IntakeClerk, Role::Manager],
            })
        }
    }

    async fn require_any(&self, actor_id: &ActorId, allowed: &[Role]) -> CaseResult<()> {
        let held = self.roles.roles_of(actor_id).await?;
        if held.iter().any(|r| allowed.contains(r)) {
            Ok(())
        } else {
            Err(CaseError::RoleMismatch {
                actor_id: actor_id.clone(),
                required: allowed.to_vec(),
            })
        }
    }
}
