//! Site inspection record

use crate::{ActorId, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The site visit of the case's current inspection round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    /// When the visit takes place
    pub scheduled_for: DateTime<Utc>,
    /// Inspector who owns the visit
    pub inspector: ActorId,
    pub scheduled_at: DateTime<Utc>,
    /// Findings filed with the inspector's decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Inspection {
    pub fn new(
        inspector: ActorId,
        scheduled_for: DateTime<Utc>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scheduled_for,
            inspector,
            scheduled_at,
            report: None,
            result: None,
            completed_at: None,
        }
    }

    /// Scheduled and not yet reported on
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    /// File the result of the visit. No effect once completed.
    pub fn complete(&mut self, result: Outcome, report: Option<String>, now: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }
        self.result = Some(result);
        self.report = report;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_complete_once() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let mut visit = Inspection::new(ActorId::new("insp-1"), t0 + Duration::days(2), t0);
        assert!(visit.is_open());

        visit.complete(Outcome::Return, Some("setback 1.2 m short".to_string()), t0);
        assert!(!visit.is_open());
        assert_eq!(visit.result, Some(Outcome::Return));

        visit.complete(Outcome::Accept, None, t0);
        assert_eq!(visit.report.as_deref(), Some("setback 1.2 m short"));
    }
}
