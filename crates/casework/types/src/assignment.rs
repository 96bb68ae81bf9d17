//! Per-department assignments and deadlines

use crate::{ActorId, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Assignment ───────────────────────────────────────────────────────

/// Lifecycle of one assignment instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Returned,
}

impl AssignmentStatus {
    /// Done and Returned close the assignment for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Returned)
    }
}

/// The actor responsible for a department's decision on a case
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub actor_id: ActorId,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    /// Whole minutes between assignment and completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handling_minutes: Option<i64>,
}

impl Assignment {
    /// Create a pending assignment
    pub fn new(actor_id: ActorId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            actor_id,
            assigned_at,
            completed_at: None,
            status: AssignmentStatus::Pending,
            handling_minutes: None,
        }
    }

    /// Pending → InProgress
    pub fn start(&mut self) {
        if self.status == AssignmentStatus::Pending {
            self.status = AssignmentStatus::InProgress;
        }
    }

    /// Close the assignment. Returns the handling time in minutes, or
    /// `None` if it was already closed.
    pub fn complete(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Option<i64> {
        if self.status.is_terminal() {
            return None;
        }
        let minutes = now
            .signed_duration_since(self.assigned_at)
            .num_minutes()
            .max(0);
        self.status = if outcome.completes_assignment() {
            AssignmentStatus::Done
        } else {
            AssignmentStatus::Returned
        };
        self.completed_at = Some(now);
        self.handling_minutes = Some(minutes);
        Some(minutes)
    }

    /// Close an open assignment as Returned without a decision, when the
    /// case is routed away from its department.
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> Option<i64> {
        self.complete(Outcome::Return, now)
    }

    /// Pending or InProgress
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_held_by(&self, actor_id: &ActorId) -> bool {
        &self.actor_id == actor_id
    }
}

// ── Deadline ─────────────────────────────────────────────────────────

/// Service-level deadline for one department
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub started_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub business_days_allowed: u32,
    /// Maintained by the sweeper, see [`Deadline::compute_overdue`]
    pub is_overdue: bool,
}

impl Deadline {
    pub fn new(started_at: DateTime<Utc>, due_at: DateTime<Utc>, business_days: u32) -> Self {
        Self {
            started_at,
            due_at,
            business_days_allowed: business_days,
            is_overdue: false,
        }
    }

    /// `now > due_at` while the department's assignment is still open
    pub fn compute_overdue(&self, assignment: Option<&Assignment>, now: DateTime<Utc>) -> bool {
        let closed = assignment.map(|a| a.status.is_terminal()).unwrap_or(false);
        now > self.due_at && !closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_assignment_lifecycle() {
        let mut a = Assignment::new(ActorId::new("clerk-1"), t0());
        assert_eq!(a.status, AssignmentStatus::Pending);
        a.start();
        assert_eq!(a.status, AssignmentStatus::InProgress);
        assert!(a.is_active());

        let minutes = a.complete(Outcome::Accept, t0() + Duration::minutes(95));
        assert_eq!(minutes, Some(95));
        assert_eq!(a.status, AssignmentStatus::Done);
        assert!(!a.is_active());
    }

    #[test]
    fn test_return_marks_returned() {
        let mut a = Assignment::new(ActorId::new("rev-1"), t0());
        a.start();
        a.complete(Outcome::Return, t0() + Duration::seconds(150));
        assert_eq!(a.status, AssignmentStatus::Returned);
        assert_eq!(a.handling_minutes, Some(2));
    }

    #[test]
    fn test_closed_assignment_cannot_complete_twice() {
        let mut a = Assignment::new(ActorId::new("rev-1"), t0());
        a.start();
        assert!(a.complete(Outcome::Accept, t0()).is_some());
        assert!(a.complete(Outcome::Accept, t0()).is_none());
    }

    #[test]
    fn test_withdraw_closes_as_returned() {
        let mut a = Assignment::new(ActorId::new("clerk-2"), t0());
        a.start();
        assert_eq!(a.withdraw(t0() + Duration::minutes(20)), Some(20));
        assert_eq!(a.status, AssignmentStatus::Returned);
        assert!(a.withdraw(t0()).is_none());
    }

    #[test]
    fn test_overdue_requires_open_assignment() {
        let deadline = Deadline::new(t0(), t0() + Duration::days(2), 2);
        let later = t0() + Duration::days(3);

        assert!(!deadline.compute_overdue(None, t0()));
        assert!(deadline.compute_overdue(None, later));

        let mut a = Assignment::new(ActorId::new("clerk-1"), t0());
        a.start();
        assert!(deadline.compute_overdue(Some(&a), later));
        a.complete(Outcome::Accept, t0());
        assert!(!deadline.compute_overdue(Some(&a), later));
    }

    #[test]
    fn test_due_instant_itself_is_not_overdue() {
        let deadline = Deadline::new(t0(), t0() + Duration::days(1), 1);
        assert!(!deadline.compute_overdue(None, deadline.due_at));
    }
}
