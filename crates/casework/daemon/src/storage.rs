//! Case store construction and JSON snapshots
//!
//! The daemon always runs on [`InMemoryCaseStore`]. With snapshot storage
//! configured, the store is seeded from a JSON array of cases on start and
//! the array is written back on shutdown.

use crate::config::StorageConfig;
use crate::error::DaemonResult;
use casework_engine::{CaseStore, InMemoryCaseStore};
use casework_types::Case;
use std::path::Path;
use std::sync::Arc;

/// Build the store described by `config`
pub fn open_store(config: &StorageConfig) -> DaemonResult<Arc<InMemoryCaseStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryCaseStore::new())),
        StorageConfig::Snapshot { path, .. } => {
            let cases = read_snapshot(path)?;
            tracing::info!(path = %path.display(), cases = cases.len(), "Loaded case snapshot");
            Ok(Arc::new(InMemoryCaseStore::from_cases(cases)))
        }
    }
}

/// Read a snapshot. A missing file is an empty snapshot.
pub fn read_snapshot(path: &Path) -> DaemonResult<Vec<Case>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Snapshot not found, starting empty");
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write every case in `store` to `path`, replacing the file atomically
pub async fn write_snapshot(store: &dyn CaseStore, path: &Path) -> DaemonResult<usize> {
    let cases: Vec<Case> = store
        .list_cases()
        .await
        .map_err(casework_types::CaseError::from)?
        .into_iter()
        .map(|(case, _)| case)
        .collect();

    let json = serde_json::to_vec_pretty(&cases)?;
    let tmp = path.with_extension("json.tmp");
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    tracing::info!(path = %path.display(), cases = cases.len(), "Wrote case snapshot");
    Ok(cases.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casework_engine::{CaseEngine, EngineConfig, StaticRoleDirectory};
    use casework_types::{ActorId, Applicant, NewCase, Project};
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("caseworkd-{}-{}", name, std::process::id()))
            .join("cases.json")
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let cases = read_snapshot(Path::new("/nonexistent/caseworkd/cases.json")).unwrap();
        assert!(cases.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_resumes_sequence() {
        let path = scratch("roundtrip");
        let store = open_store(&StorageConfig::Memory).unwrap();
        let engine = CaseEngine::new(
            store.clone(),
            Arc::new(StaticRoleDirectory::new()),
            EngineConfig::default(),
        );
        let draft = NewCase::new(
            Applicant::default(),
            Project::default(),
            ActorId::new("applicant-1"),
        );
        engine.create_case(draft.clone()).await.unwrap();
        engine.create_case(draft.clone()).await.unwrap();

        assert_eq!(write_snapshot(store.as_ref(), &path).await.unwrap(), 2);

        let reopened = open_store(&StorageConfig::Snapshot {
            path: path.clone(),
            write_on_shutdown: true,
        })
        .unwrap();
        assert_eq!(reopened.len(), 2);

        let engine = CaseEngine::new(
            reopened,
            Arc::new(StaticRoleDirectory::new()),
            EngineConfig::default(),
        );
        let (third, _) = engine.create_case(draft).await.unwrap();
        assert!(third.id.as_str().ends_with("-000003"));

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let path = scratch("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        assert!(read_snapshot(&path).is_err());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
