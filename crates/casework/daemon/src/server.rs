//! Daemon setup and lifecycle management

use crate::config::{DaemonConfig, DirectoryConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::storage;
use casework_engine::{
    CaseEngine, DeadlineSweeper, InMemoryCaseStore, Notifier, StaticRoleDirectory,
    TracingNotifier,
};
use casework_types::{ActorId, OverdueAlert};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

/// Casework daemon
pub struct Daemon {
    config: DaemonConfig,
    store: Arc<InMemoryCaseStore>,
    engine: CaseEngine,
    notifier: Arc<dyn Notifier>,
    sweep_interval: Duration,
}

impl Daemon {
    /// Create a daemon from configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = storage::open_store(&config.storage)?;

        let directory = build_directory(&config.directory);
        let engine = CaseEngine::new(store.clone(), Arc::new(directory), config.engine.clone());
        let sweep_interval = Duration::from_secs(config.engine.sweep_interval_secs.max(1));

        Ok(Self {
            config,
            store,
            engine,
            notifier: Arc::new(TracingNotifier),
            sweep_interval,
        })
    }

    /// Replace the notifier that receives overdue alerts
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn engine(&self) -> &CaseEngine {
        &self.engine
    }

    /// Override the configured sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    fn sweeper(&self) -> DeadlineSweeper {
        DeadlineSweeper::new(self.engine.clone(), self.notifier.clone())
            .with_interval(self.sweep_interval)
    }

    /// Run one sweep cycle, persist, and return the alerts raised
    pub async fn run_once(&self) -> DaemonResult<Vec<OverdueAlert>> {
        let alerts = self.sweeper().run_cycle().await?;
        self.persist().await?;
        Ok(alerts)
    }

    /// Run until SIGINT/SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the sweeper until `shutdown` resolves, then stop it and persist
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> DaemonResult<()> {
        let sweeper = self.sweeper();
        tracing::info!(
            interval_secs = sweeper.interval().as_secs(),
            payment_required = self.config.engine.payment_required,
            "Casework daemon running"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.run(stop_rx));

        shutdown.await;

        // the sweeper finishes its current cycle before stopping
        let _ = stop_tx.send(true);
        let cycles = handle
            .await
            .map_err(|e| DaemonError::Task(e.to_string()))?;
        tracing::info!(cycles, "Sweeper stopped");

        self.persist().await
    }

    /// Write the snapshot back when configured to
    async fn persist(&self) -> DaemonResult<()> {
        if let StorageConfig::Snapshot {
            path,
            write_on_shutdown: true,
        } = &self.config.storage
        {
            storage::write_snapshot(self.store.as_ref(), path).await?;
        }
        Ok(())
    }
}

/// Static role table from configuration
fn build_directory(config: &DirectoryConfig) -> StaticRoleDirectory {
    let directory = StaticRoleDirectory::new();
    for (actor, roles) in &config.actors {
        directory.grant(ActorId::new(actor.clone()), roles);
    }
    if config.actors.is_empty() {
        tracing::warn!("Role directory is empty; every role check will fail");
    }
    directory
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;
    use casework_engine::{CaseStore, RecordingNotifier};
    use casework_types::{Applicant, Intent, NewCase, Project, Role};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn config_with_clerk() -> DaemonConfig {
        let mut actors = BTreeMap::new();
        actors.insert("clerk-1".to_string(), vec![Role::IntakeClerk]);
        DaemonConfig {
            directory: DirectoryConfig { actors },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_directory_comes_from_config() {
        let daemon = Daemon::new(config_with_clerk()).unwrap();
        let (case, _) = daemon
            .engine()
            .create_case(NewCase::new(
                Applicant::default(),
                Project::default(),
                ActorId::new("applicant-1"),
            ))
            .await
            .unwrap();
        daemon
            .engine()
            .change_priority(&case.id, &ActorId::new("clerk-1"), casework_types::Priority::High)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_once_alerts_on_overdue_case() {
        let notifier = Arc::new(RecordingNotifier::new());
        let daemon = Daemon::new(config_with_clerk())
            .unwrap()
            .with_notifier(notifier.clone());

        // an old case, long past its intake deadline
        let filed = Utc.with_ymd_and_hms(2020, 1, 6, 9, 0, 0).unwrap();
        let case = casework_types::Case::open(
            casework_types::CaseId::new("EXP-2020-000001"),
            NewCase::new(Applicant::default(), Project::default(), ActorId::new("applicant-1")),
            true,
            casework_types::Deadline::new(filed, filed + chrono::Duration::days(2), 2),
        );
        daemon.store.insert_case(&case).await.unwrap();

        let alerts = daemon.run_once().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(matches!(notifier.intents()[0], Intent::OverdueAlert(_)));
        assert!(daemon.run_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_until_stops_and_persists() {
        let path = std::env::temp_dir()
            .join(format!("caseworkd-run-{}", std::process::id()))
            .join("cases.json");
        let config = DaemonConfig {
            storage: StorageConfig::Snapshot {
                path: path.clone(),
                write_on_shutdown: true,
            },
            ..config_with_clerk()
        };

        let daemon = Daemon::new(config)
            .unwrap()
            .with_sweep_interval(Duration::from_millis(10));
        daemon
            .engine()
            .create_case(NewCase::new(
                Applicant::default(),
                Project::default(),
                ActorId::new("applicant-1"),
            ))
            .await
            .unwrap();

        daemon
            .run_until(tokio::time::sleep(Duration::from_millis(40)))
            .await
            .unwrap();

        let saved = storage::read_snapshot(&path).unwrap();
        assert_eq!(saved.len(), 1);
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }
}
