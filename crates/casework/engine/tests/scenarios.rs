//! End-to-end case scenarios through the public engine API.

use async_trait::async_trait;
use casework_engine::*;
use casework_types::*;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    // Monday
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn directory() -> StaticRoleDirectory {
    StaticRoleDirectory::new()
        .with_actor("clerk-1", &[Role::IntakeClerk])
        .with_actor("actor-a", &[Role::IntakeClerk])
        .with_actor("actor-b", &[Role::TechnicalReviewer])
        .with_actor("insp-1", &[Role::Inspector])
        .with_actor("actor-g", &[Role::Manager])
}

fn engine_with(store: Arc<dyn CaseStore>, payment_required: bool) -> CaseEngine {
    let config = EngineConfig {
        payment_required,
        ..Default::default()
    };
    CaseEngine::new(store, Arc::new(directory()), config)
        .with_clock(Arc::new(ManualClock::new(t0())))
}

fn draft() -> NewCase {
    NewCase::new(
        Applicant {
            full_name: "Rosa Huaman".to_string(),
            ..Default::default()
        },
        Project {
            name: "Warehouse extension".to_string(),
            levels: 1,
            ..Default::default()
        },
        ActorId::new("applicant-1"),
    )
}

fn actor(id: &str) -> ActorId {
    ActorId::new(id)
}

async fn assign(engine: &CaseEngine, case_id: &CaseId, dept: Department, who: &str, role: Role) {
    engine
        .assign(AssignRequest::new(
            case_id.clone(),
            dept,
            actor(who),
            role,
            actor("clerk-1"),
        ))
        .await
        .unwrap();
}

async fn decide(
    engine: &CaseEngine,
    case_id: &CaseId,
    dept: Department,
    who: &str,
    outcome: Outcome,
) -> CaseResult<(DecisionResult, Vec<Intent>)> {
    let mut request = DecideRequest::new(case_id.clone(), dept, actor(who), outcome);
    if outcome.requires_note() {
        request = request.with_note("see attached observations");
    }
    engine.decide(request).await
}

/// Drive a fresh case into Management/ManagementReview
async fn case_in_management(engine: &CaseEngine) -> CaseId {
    let (case, _) = engine.create_case(draft()).await.unwrap();
    let id = case.id;
    decide(engine, &id, Department::Intake, "clerk-1", Outcome::Accept)
        .await
        .unwrap();
    assign(engine, &id, Department::TechnicalReview, "actor-b", Role::TechnicalReviewer).await;
    decide(engine, &id, Department::TechnicalReview, "actor-b", Outcome::Accept)
        .await
        .unwrap();
    assign(engine, &id, Department::Inspection, "insp-1", Role::Inspector).await;
    decide(engine, &id, Department::Inspection, "insp-1", Outcome::Accept)
        .await
        .unwrap();
    id
}

/// A store whose loads wait for each other once armed, so two requests
/// both read the same version before either writes.
struct GatedStore {
    inner: InMemoryCaseStore,
    armed: AtomicBool,
    barrier: Barrier,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: InMemoryCaseStore::new(),
            armed: AtomicBool::new(false),
            barrier: Barrier::new(2),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaseStore for GatedStore {
    async fn load_case(&self, case_id: &CaseId) -> StoreResult<(Case, Version)> {
        let loaded = self.inner.load_case(case_id).await?;
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
        Ok(loaded)
    }

    async fn save_case(&self, case: &Case, expected_version: Version) -> StoreResult<Version> {
        self.inner.save_case(case, expected_version).await
    }

    async fn insert_case(&self, case: &Case) -> StoreResult<Version> {
        self.inner.insert_case(case).await
    }

    async fn list_cases(&self) -> StoreResult<Vec<(Case, Version)>> {
        self.inner.list_cases().await
    }

    async fn next_case_number(&self, year: i32) -> StoreResult<u64> {
        self.inner.next_case_number(year).await
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intake_assignment_then_accept() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), true);
    let (case, _) = engine.create_case(draft()).await.unwrap();

    assign(&engine, &case.id, Department::Intake, "actor-a", Role::IntakeClerk).await;
    let (result, _) = decide(&engine, &case.id, Department::Intake, "actor-a", Outcome::Accept)
        .await
        .unwrap();
    assert_eq!(result.next_department, Department::TechnicalReview);

    let stored = engine.get_case(&case.id).await.unwrap();
    assert_eq!(stored.current_department, Department::TechnicalReview);
    assert_eq!(
        stored.assignment(Department::Intake).unwrap().status,
        AssignmentStatus::Done
    );
    assert_eq!(stored.history.len(), 2);
    assert_eq!(stored.history[0].kind, ActionKind::Assigned);
    assert_eq!(stored.history[1].kind, ActionKind::Decision);
}

#[tokio::test]
async fn unassigned_reviewer_cannot_decide() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), true);
    let (case, _) = engine.create_case(draft()).await.unwrap();
    decide(&engine, &case.id, Department::Intake, "clerk-1", Outcome::Accept)
        .await
        .unwrap();

    let before = engine.get_case(&case.id).await.unwrap();
    let err = engine
        .decide(
            DecideRequest::new(
                case.id.clone(),
                Department::TechnicalReview,
                actor("actor-b"),
                Outcome::Return,
            )
            .with_note("missing plan"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CaseError::NoActiveAssignment { .. }));
    assert_eq!(engine.get_case(&case.id).await.unwrap(), before);
}

#[tokio::test]
async fn concurrent_decisions_conflict() {
    let store = Arc::new(GatedStore::new());
    let engine = engine_with(store.clone(), true);
    let (case, _) = engine.create_case(draft()).await.unwrap();
    assign(&engine, &case.id, Department::Intake, "actor-a", Role::IntakeClerk).await;

    store.arm();
    let (first, second) = tokio::join!(
        decide(&engine, &case.id, Department::Intake, "actor-a", Outcome::Accept),
        decide(&engine, &case.id, Department::Intake, "actor-a", Outcome::Accept),
    );

    let results = [first, second];
    let won = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CaseError::ConcurrentModification { .. })))
        .count();
    assert_eq!(won, 1);
    assert_eq!(conflicts, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(CaseError::is_retryable));

    let stored = store.inner.load_case(&case.id).await.unwrap();
    assert_eq!(stored.1, 3);
    let decisions = stored
        .0
        .history
        .iter()
        .filter(|h| h.kind == ActionKind::Decision)
        .count();
    assert_eq!(decisions, 1);
}

#[tokio::test]
async fn management_approval_finalizes_case() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), false);
    let id = case_in_management(&engine).await;

    let (result, intents) =
        decide(&engine, &id, Department::Management, "actor-g", Outcome::Approve)
            .await
            .unwrap();
    assert_eq!(result.to_status, CaseStatus::Approved);
    assert!(result.to_status.is_terminal());
    assert!(intents.contains(&Intent::GenerateLicenseArtifact { case_id: id.clone() }));

    let err = engine
        .assign(AssignRequest::new(
            id.clone(),
            Department::Inspection,
            actor("insp-1"),
            Role::Inspector,
            actor("actor-g"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, CaseError::TerminalCase(_)));

    for (dept, who, outcome) in [
        (Department::Management, "actor-g", Outcome::Reject),
        (Department::Intake, "clerk-1", Outcome::Accept),
    ] {
        let err = decide(&engine, &id, dept, who, outcome).await.unwrap_err();
        assert!(matches!(err, CaseError::TerminalCase(_)));
    }

    engine
        .record_license_issued(&id, &actor("actor-g"), "LIC-2026-000001")
        .await
        .unwrap();
    let err = decide(&engine, &id, Department::Management, "actor-g", Outcome::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, CaseError::TerminalCase(_)));
}

#[tokio::test]
async fn rejection_is_permanent() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), true);
    let id = case_in_management(&engine).await;

    let (result, intents) = decide(&engine, &id, Department::Management, "actor-g", Outcome::Reject)
        .await
        .unwrap();
    assert_eq!(result.to_status, CaseStatus::Rejected);
    assert!(!intents
        .iter()
        .any(|i| matches!(i, Intent::GenerateLicenseArtifact { .. })));

    let err = engine
        .resubmit(&id, &actor("applicant-1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CaseError::TerminalCase(_)));
}

#[tokio::test]
async fn accept_changes_only_workflow_fields() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), true);
    let (case, _) = engine.create_case(draft()).await.unwrap();
    assign(&engine, &case.id, Department::Intake, "actor-a", Role::IntakeClerk).await;
    let before = engine.get_case(&case.id).await.unwrap();

    decide(&engine, &case.id, Department::Intake, "actor-a", Outcome::Accept)
        .await
        .unwrap();
    let after = engine.get_case(&case.id).await.unwrap();

    let mut expected = after.clone();
    expected.assignments = before.assignments.clone();
    expected.current_department = before.current_department;
    expected.status = before.status;
    expected.history = before.history.clone();
    assert_eq!(expected, before);

    assert_eq!(after.history.len(), before.history.len() + 1);
    assert_eq!(&after.history[..before.history.len()], &before.history[..]);
}

#[tokio::test]
async fn overdue_sweep_with_business_days() {
    let store = Arc::new(InMemoryCaseStore::new());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap()));
    let engine = CaseEngine::new(store, Arc::new(directory()), EngineConfig::default())
        .with_clock(clock.clone());

    // filed Friday, two business days → due Tuesday 10:00
    let (case, _) = engine.create_case(draft()).await.unwrap();
    let due = case.deadline(Department::Intake).unwrap().due_at;
    assert_eq!(due, Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap());

    assert!(engine.sweep(due).await.unwrap().is_empty());
    let alerts = engine.sweep(due + Duration::minutes(1)).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].due_at, due);

    let snapshot = engine.aggregate(&CaseFilter::all()).await.unwrap();
    assert_eq!(snapshot.overdue_cases, 1);
}

#[tokio::test]
async fn intents_reach_collaborators() {
    let engine = engine_with(Arc::new(InMemoryCaseStore::new()), false);
    let id = case_in_management(&engine).await;
    let (_, intents) = decide(&engine, &id, Department::Management, "actor-g", Outcome::Approve)
        .await
        .unwrap();

    let notifier = Arc::new(RecordingNotifier::new());
    let artifacts = Arc::new(RecordingNotifier::new());
    let dispatcher = IntentDispatcher::new(notifier.clone(), artifacts.clone());
    let report = dispatcher.dispatch_all(intents, engine.now()).await;

    assert!(report.is_complete());
    assert_eq!(
        artifacts.intents(),
        vec![Intent::GenerateLicenseArtifact { case_id: id.clone() }]
    );
    assert!(notifier.intents().iter().all(|i| i.case_id() == &id));
}
