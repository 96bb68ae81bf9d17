//! Statistics aggregator
//!
//! Read-side projection over a case population. Holds no state; every
//! figure is derived from the cases passed in. Averages over an empty
//! sample are 0.

use casework_types::{ActionKind, ActorId, Case, CaseStatus, Department, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Filter ───────────────────────────────────────────────────────────

/// Selects the cases a snapshot is computed over
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Cases the actor holds an assignment on or decided on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_to: Option<DateTime<Utc>>,
}

impl CaseFilter {
    /// Match every case
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_actor(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Half-open creation window `[from, to)`
    pub fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    pub fn matches(&self, case: &Case) -> bool {
        self.department.map_or(true, |d| case.current_department == d)
            && self.status.map_or(true, |s| case.status == s)
            && self.priority.map_or(true, |p| case.priority == p)
            && self
                .actor_id
                .as_ref()
                .map_or(true, |a| case.involves_actor(a))
            && self.created_from.map_or(true, |from| case.created_at >= from)
            && self.created_to.map_or(true, |to| case.created_at < to)
    }
}

// ── Snapshots ────────────────────────────────────────────────────────

/// System-wide figures over a case population
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_cases: usize,
    pub by_status: BTreeMap<CaseStatus, usize>,
    pub by_department: BTreeMap<Department, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    /// Cases with at least one deadline flagged overdue
    pub overdue_cases: usize,
    /// Mean handling minutes of Done decisions, per deciding department
    pub average_handling_minutes: BTreeMap<Department, f64>,
}

impl StatisticsSnapshot {
    pub fn count_in(&self, department: Department) -> usize {
        self.by_department.get(&department).copied().unwrap_or(0)
    }

    pub fn count_with(&self, status: CaseStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn average_minutes(&self, department: Department) -> f64 {
        self.average_handling_minutes
            .get(&department)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Workload figures for one officer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorStatistics {
    pub actor_id: ActorId,
    /// Assignments the actor currently holds open
    pub open_assignments: usize,
    /// Open assignments whose deadline is flagged overdue
    pub overdue_assignments: usize,
    /// Decisions taken, any outcome
    pub decisions: usize,
    /// Decisions that completed the assignment (accept, approve, reject)
    pub completed: usize,
    /// Decisions that sent the case back
    pub returned: usize,
    pub average_handling_minutes: f64,
}

// ── Aggregator ───────────────────────────────────────────────────────

/// Computes statistics snapshots
#[derive(Clone, Copy, Debug, Default)]
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Figures over every case matching `filter`
    pub fn compute<'a>(
        &self,
        cases: impl IntoIterator<Item = &'a Case>,
        filter: &CaseFilter,
    ) -> StatisticsSnapshot {
        let mut snapshot = StatisticsSnapshot::default();
        let mut timings: BTreeMap<Department, (i64, usize)> = Department::ACTIVE
            .iter()
            .map(|d| (*d, (0, 0)))
            .collect();

        for case in cases.into_iter().filter(|c| filter.matches(c)) {
            snapshot.total_cases += 1;
            *snapshot.by_status.entry(case.status).or_default() += 1;
            *snapshot
                .by_department
                .entry(case.current_department)
                .or_default() += 1;
            *snapshot.by_priority.entry(case.priority).or_default() += 1;
            if case.has_overdue_deadline() {
                snapshot.overdue_cases += 1;
            }

            for entry in case.history.iter().filter(|h| h.is_completed_decision()) {
                let slot = timings.entry(entry.department).or_default();
                slot.0 += entry.handling_minutes.unwrap_or(0);
                slot.1 += 1;
            }
        }

        snapshot.average_handling_minutes = timings
            .into_iter()
            .map(|(d, (sum, n))| (d, mean(sum, n)))
            .collect();
        snapshot
    }

    /// Workload figures for `actor_id` across `cases`
    pub fn actor_statistics<'a>(
        &self,
        cases: impl IntoIterator<Item = &'a Case>,
        actor_id: &ActorId,
    ) -> ActorStatistics {
        let mut stats = ActorStatistics {
            actor_id: actor_id.clone(),
            open_assignments: 0,
            overdue_assignments: 0,
            decisions: 0,
            completed: 0,
            returned: 0,
            average_handling_minutes: 0.0,
        };
        let mut total_minutes = 0i64;

        for case in cases {
            for (department, assignment) in &case.assignments {
                if assignment.is_active() && assignment.is_held_by(actor_id) {
                    stats.open_assignments += 1;
                    if case.deadline(*department).map_or(false, |d| d.is_overdue) {
                        stats.overdue_assignments += 1;
                    }
                }
            }

            for entry in case
                .history
                .iter()
                .filter(|h| h.kind == ActionKind::Decision && &h.actor_id == actor_id)
            {
                stats.decisions += 1;
                if entry.is_completed_decision() {
                    stats.completed += 1;
                    total_minutes += entry.handling_minutes.unwrap_or(0);
                } else {
                    stats.returned += 1;
                }
            }
        }

        stats.average_handling_minutes = mean(total_minutes, stats.completed);
        stats
    }
}

fn mean(sum: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
