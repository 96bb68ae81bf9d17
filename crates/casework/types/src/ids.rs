//! Identifiers for cases and actors

use serde::{Deserialize, Serialize};

// ── Case Identifier ──────────────────────────────────────────────────

/// Human-readable case number, e.g. `EXP-2026-000042`.
///
/// Issued once at creation from a per-year sequence and never changed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build `<prefix>-<year>-<NNNNNN>` from a yearly sequence number.
    pub fn from_sequence(prefix: &str, year: i32, sequence: u64) -> Self {
        Self(format!("{}-{}-{:06}", prefix, year, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The year segment of a sequence-issued case number.
    pub fn year(&self) -> Option<i32> {
        self.0.split('-').nth(1).and_then(|y| y.parse().ok())
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Actor Identifier ─────────────────────────────────────────────────

/// Identity of a human actor (officer or applicant)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
