//! In-memory reference implementation of [`CaseStore`].
//!
//! Deterministic and test-friendly. Deployments that need durability
//! should put a transactional backend behind the same trait.

use crate::store::{CaseStore, StoreError, StoreResult, Version};
use async_trait::async_trait;
use casework_types::{Case, CaseId};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory case store
#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<CaseId, (Case, Version)>>,
    sequences: RwLock<HashMap<i32, u64>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing cases, each at version 1.
    ///
    /// Yearly sequences resume after the highest case number seen.
    pub fn from_cases(cases: impl IntoIterator<Item = Case>) -> Self {
        let mut map = HashMap::new();
        let mut sequences: HashMap<i32, u64> = HashMap::new();
        for case in cases {
            if let Some((year, seq)) = parse_sequence(&case.id) {
                let entry = sequences.entry(year).or_default();
                *entry = (*entry).max(seq);
            }
            map.insert(case.id.clone(), (case, 1));
        }
        Self {
            cases: RwLock::new(map),
            sequences: RwLock::new(sequences),
        }
    }

    pub fn len(&self) -> usize {
        self.cases.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_sequence(id: &CaseId) -> Option<(i32, u64)> {
    let year = id.year()?;
    let seq = id.as_str().rsplit('-').next()?.parse().ok()?;
    Some((year, seq))
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn load_case(&self, case_id: &CaseId) -> StoreResult<(Case, Version)> {
        let guard = self
            .cases
            .read()
            .map_err(|_| StoreError::Backend("cases lock poisoned".to_string()))?;
        guard
            .get(case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(case_id.clone()))
    }

    async fn save_case(&self, case: &Case, expected_version: Version) -> StoreResult<Version> {
        let mut guard = self
            .cases
            .write()
            .map_err(|_| StoreError::Backend("cases lock poisoned".to_string()))?;

        let slot = guard
            .get_mut(&case.id)
            .ok_or_else(|| StoreError::NotFound(case.id.clone()))?;
        if slot.1 != expected_version {
            return Err(StoreError::VersionConflict {
                case_id: case.id.clone(),
                expected: expected_version,
                found: slot.1,
            });
        }

        let next = slot.1 + 1;
        *slot = (case.clone(), next);
        Ok(next)
    }

    async fn insert_case(&self, case: &Case) -> StoreResult<Version> {
        let mut guard = self
            .cases
            .write()
            .map_err(|_| StoreError::Backend("cases lock poisoned".to_string()))?;

        if guard.contains_key(&case.id) {
            return Err(StoreError::Conflict(format!("case {} already exists", case.id)));
        }
        guard.insert(case.id.clone(), (case.clone(), 1));
        Ok(1)
    }

    async fn list_cases(&self) -> StoreResult<Vec<(Case, Version)>> {
        let guard = self
            .cases
            .read()
            .map_err(|_| StoreError::Backend("cases lock poisoned".to_string()))?;
        let mut cases: Vec<_> = guard.values().cloned().collect();
        cases.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        Ok(cases)
    }

    async fn next_case_number(&self, year: i32) -> StoreResult<u64> {
        let mut guard = self
            .sequences
            .write()
            .map_err(|_| StoreError::Backend("sequences lock poisoned".to_string()))?;
        let counter = guard.entry(year).or_default();
        *counter += 1;
        Ok(*counter)
    }
}
