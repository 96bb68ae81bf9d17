//! Intent dispatch
//!
//! Engine operations return [`Intent`] values. The caller wraps them in
//! envelopes and forwards them here: licence generation goes to the
//! [`ArtifactGenerator`], everything else to the [`Notifier`].
//! Envelope ids let collaborators drop duplicates on redelivery.

use async_trait::async_trait;
use casework_types::{CaseId, Intent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by intent collaborators
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// An intent stamped for delivery
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEnvelope {
    pub intent_id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub intent: Intent,
}

impl IntentEnvelope {
    pub fn new(intent: Intent, emitted_at: DateTime<Utc>) -> Self {
        Self {
            intent_id: Uuid::new_v4(),
            emitted_at,
            intent,
        }
    }
}

// ── Collaborator traits ──────────────────────────────────────────────

/// Delivers notifications (mail, in-app)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, envelope: &IntentEnvelope) -> Result<(), DispatchError>;
}

/// Renders licence documents for approved cases
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate_license(
        &self,
        case_id: &CaseId,
        envelope: &IntentEnvelope,
    ) -> Result<(), DispatchError>;
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Outcome of forwarding a batch of intents
#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<IntentEnvelope>,
    pub failed: Vec<(IntentEnvelope, String)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Routes intents to their collaborators
#[derive(Clone)]
pub struct IntentDispatcher {
    notifier: Arc<dyn Notifier>,
    artifacts: Arc<dyn ArtifactGenerator>,
}

impl IntentDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, artifacts: Arc<dyn ArtifactGenerator>) -> Self {
        Self {
            notifier,
            artifacts,
        }
    }

    /// Deliver one envelope
    pub async fn dispatch(&self, envelope: &IntentEnvelope) -> Result<(), DispatchError> {
        match &envelope.intent {
            Intent::GenerateLicenseArtifact { case_id } => {
                self.artifacts.generate_license(case_id, envelope).await
            }
            _ => self.notifier.notify(envelope).await,
        }
    }

    /// Stamp and deliver a batch concurrently. Failures are collected,
    /// not retried.
    pub async fn dispatch_all(&self, intents: Vec<Intent>, now: DateTime<Utc>) -> DispatchReport {
        let envelopes: Vec<_> = intents
            .into_iter()
            .map(|intent| IntentEnvelope::new(intent, now))
            .collect();

        let results =
            futures::future::join_all(envelopes.iter().map(|e| self.dispatch(e))).await;

        let mut report = DispatchReport::default();
        for (envelope, result) in envelopes.into_iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(envelope),
                Err(e) => {
                    tracing::warn!(
                        intent_id = %envelope.intent_id,
                        kind = envelope.intent.kind(),
                        error = %e,
                        "Intent delivery failed"
                    );
                    report.failed.push((envelope, e.to_string()));
                }
            }
        }
        report
    }
}

// ── Reference collaborators ──────────────────────────────────────────

/// Writes every notification to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, envelope: &IntentEnvelope) -> Result<(), DispatchError> {
        match &envelope.intent {
            Intent::OverdueAlert(alert) => tracing::warn!(
                intent_id = %envelope.intent_id,
                case_id = %alert.case_id,
                department = %alert.department,
                due_at = %alert.due_at,
                "Case overdue"
            ),
            intent => tracing::info!(
                intent_id = %envelope.intent_id,
                case_id = %intent.case_id(),
                kind = intent.kind(),
                "Notification"
            ),
        }
        Ok(())
    }
}

/// Logs licence generation requests without rendering anything
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingArtifactGenerator;

#[async_trait]
impl ArtifactGenerator for TracingArtifactGenerator {
    async fn generate_license(
        &self,
        case_id: &CaseId,
        envelope: &IntentEnvelope,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            intent_id = %envelope.intent_id,
            case_id = %case_id,
            "Licence generation requested"
        );
        Ok(())
    }
}

/// Keeps every envelope it receives, for embedding and tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<IntentEnvelope>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<IntentEnvelope> {
        self.received
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.received().into_iter().map(|e| e.intent).collect()
    }

    fn record(&self, envelope: &IntentEnvelope) -> Result<(), DispatchError> {
        self.received
            .lock()
            .map_err(|_| DispatchError::Delivery("recording lock poisoned".to_string()))?
            .push(envelope.clone());
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, envelope: &IntentEnvelope) -> Result<(), DispatchError> {
        self.record(envelope)
    }
}

#[async_trait]
impl ArtifactGenerator for RecordingNotifier {
    async fn generate_license(
        &self,
        _case_id: &CaseId,
        envelope: &IntentEnvelope,
    ) -> Result<(), DispatchError> {
        self.record(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casework_types::{ActorId, Department};

    struct FailingGenerator;

    #[async_trait]
    impl ArtifactGenerator for FailingGenerator {
        async fn generate_license(
            &self,
            _case_id: &CaseId,
            _envelope: &IntentEnvelope,
        ) -> Result<(), DispatchError> {
            Err(DispatchError::Delivery("renderer offline".to_string()))
        }
    }

    fn case_id() -> CaseId {
        CaseId::new("EXP-2026-000001")
    }

    #[tokio::test]
    async fn test_routes_by_intent_kind() {
        let notifier = Arc::new(RecordingNotifier::new());
        let artifacts = Arc::new(RecordingNotifier::new());
        let dispatcher = IntentDispatcher::new(notifier.clone(), artifacts.clone());

        let report = dispatcher
            .dispatch_all(
                vec![
                    Intent::NotifyActor {
                        actor_id: ActorId::new("rev-1"),
                        case_id: case_id(),
                        department: Department::TechnicalReview,
                    },
                    Intent::GenerateLicenseArtifact { case_id: case_id() },
                ],
                Utc::now(),
            )
            .await;

        assert!(report.is_complete());
        assert_eq!(report.delivered.len(), 2);
        assert_eq!(notifier.intents().len(), 1);
        assert!(matches!(
            artifacts.intents()[0],
            Intent::GenerateLicenseArtifact { .. }
        ));
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let dispatcher = IntentDispatcher::new(
            Arc::new(TracingNotifier),
            Arc::new(FailingGenerator),
        );
        let report = dispatcher
            .dispatch_all(
                vec![Intent::GenerateLicenseArtifact { case_id: case_id() }],
                Utc::now(),
            )
            .await;
        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn test_envelopes_get_distinct_ids() {
        let now = Utc::now();
        let a = IntentEnvelope::new(Intent::PaymentAmountRequired { case_id: case_id() }, now);
        let b = IntentEnvelope::new(Intent::PaymentAmountRequired { case_id: case_id() }, now);
        assert_ne!(a.intent_id, b.intent_id);
    }
}
