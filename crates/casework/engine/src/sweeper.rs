//! Deadline sweeper
//!
//! Periodically recomputes every open case's overdue flags and raises an
//! [`OverdueAlert`] the first time the current department's deadline is
//! found overdue. Flags are persisted under the version guard, so a
//! sweep racing a decision never clobbers it: the losing case is skipped
//! and picked up on the next cycle.

use crate::dispatch::{IntentEnvelope, Notifier};
use crate::engine::CaseEngine;
use crate::store::{CaseStore, StoreError};
use casework_types::{CaseResult, OverdueAlert};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// One pass over the store as of `now`.
///
/// Running it twice with the same `now` yields no alerts the second time.
pub async fn sweep(store: &dyn CaseStore, now: DateTime<Utc>) -> CaseResult<Vec<OverdueAlert>> {
    let cases = store.list_cases().await?;
    let mut alerts = Vec::new();
    let mut flagged = 0usize;

    for (mut case, version) in cases {
        if case.is_terminal() {
            continue;
        }
        let before = case.deadlines.clone();
        let newly_overdue = case.recompute_overdue(now);
        if case.deadlines == before {
            continue;
        }

        match store.save_case(&case, version).await {
            Ok(_) => {}
            Err(StoreError::VersionConflict { case_id, .. }) => {
                tracing::debug!(case_id = %case_id, "Case changed during sweep, skipping");
                continue;
            }
            Err(e) => {
                tracing::warn!(case_id = %case.id, error = %e, "Failed to persist overdue flags");
                continue;
            }
        }
        flagged += newly_overdue.len();

        for department in newly_overdue {
            if department != case.current_department {
                continue;
            }
            let Some(deadline) = case.deadline(department) else {
                continue;
            };
            alerts.push(OverdueAlert {
                case_id: case.id.clone(),
                department,
                due_at: deadline.due_at,
                actor_id: case.active_assignment(department).map(|a| a.actor_id.clone()),
            });
        }
    }

    tracing::info!(
        newly_overdue = flagged,
        alerts = alerts.len(),
        at = %now,
        "Deadline sweep complete"
    );
    Ok(alerts)
}

/// Runs [`sweep`] on a fixed interval and forwards alerts to a notifier
pub struct DeadlineSweeper {
    engine: CaseEngine,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl DeadlineSweeper {
    pub fn new(engine: CaseEngine, notifier: Arc<dyn Notifier>) -> Self {
        let interval = Duration::from_secs(engine.config().sweep_interval_secs.max(1));
        Self {
            engine,
            notifier,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sweep once and deliver the resulting alerts
    pub async fn run_cycle(&self) -> CaseResult<Vec<OverdueAlert>> {
        let now = self.engine.now();
        let alerts = self.engine.sweep(now).await?;
        for alert in &alerts {
            let envelope = IntentEnvelope::new(alert.clone().into(), now);
            if let Err(e) = self.notifier.notify(&envelope).await {
                tracing::warn!(
                    case_id = %alert.case_id,
                    error = %e,
                    "Overdue alert delivery failed"
                );
            }
        }
        Ok(alerts)
    }

    /// Loop until `shutdown` flips to true. Returns the number of cycles run.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0u64;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Deadline sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "Deadline sweep failed");
                    }
                    cycles += 1;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(cycles, "Deadline sweeper stopped");
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::ManualClock;
    use crate::config::EngineConfig;
    use crate::dispatch::RecordingNotifier;
    use crate::engine::AssignRequest;
    use crate::memory::InMemoryCaseStore;
    use crate::roles::StaticRoleDirectory;
    use casework_types::{
        ActorId, Applicant, Department, Intent, NewCase, Project, Role,
    };
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn setup() -> (CaseEngine, Arc<ManualClock>) {
        let roles = StaticRoleDirectory::new()
            .with_actor("clerk-1", &[Role::IntakeClerk])
            .with_actor("clerk-2", &[Role::IntakeClerk]);
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = CaseEngine::new(
            Arc::new(InMemoryCaseStore::new()),
            Arc::new(roles),
            EngineConfig::default(),
        )
        .with_clock(clock.clone());
        (engine, clock)
    }

    fn draft() -> NewCase {
        NewCase::new(Applicant::default(), Project::default(), ActorId::new("applicant-1"))
    }

    #[tokio::test]
    async fn test_sweep_alerts_once() {
        let (engine, _) = setup();
        let (case, _) = engine.create_case(draft()).await.unwrap();
        engine
            .assign(AssignRequest::new(
                case.id.clone(),
                Department::Intake,
                ActorId::new("clerk-2"),
                Role::IntakeClerk,
                ActorId::new("clerk-1"),
            ))
            .await
            .unwrap();

        // due Wednesday 09:00
        let before_due = t0() + chrono::Duration::days(2);
        assert!(engine.sweep(before_due).await.unwrap().is_empty());

        let later = t0() + chrono::Duration::days(3);
        let alerts = engine.sweep(later).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].department, Department::Intake);
        assert_eq!(alerts[0].actor_id, Some(ActorId::new("clerk-2")));

        assert!(engine.sweep(later).await.unwrap().is_empty());
        let stored = engine.get_case(&case.id).await.unwrap();
        assert!(stored.deadline(Department::Intake).unwrap().is_overdue);
    }

    #[tokio::test]
    async fn test_unassigned_case_alerts_without_actor() {
        let (engine, _) = setup();
        engine.create_case(draft()).await.unwrap();
        let alerts = engine
            .sweep(t0() + chrono::Duration::days(10))
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].actor_id, None);
    }

    #[tokio::test]
    async fn test_run_cycle_notifies() {
        let (engine, clock) = setup();
        engine.create_case(draft()).await.unwrap();
        clock.advance(chrono::Duration::days(5));

        let notifier = Arc::new(RecordingNotifier::new());
        let sweeper = DeadlineSweeper::new(engine, notifier.clone());
        let alerts = sweeper.run_cycle().await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert!(matches!(notifier.intents()[0], Intent::OverdueAlert(_)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (engine, _) = setup();
        let sweeper = DeadlineSweeper::new(engine, Arc::new(RecordingNotifier::new()))
            .with_interval(Duration::from_millis(10));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(sweeper.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let cycles = handle.await.unwrap();
        assert!(cycles >= 1);
    }
}
