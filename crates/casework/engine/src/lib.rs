//! Case Workflow Engine for Casework
//!
//! Drives licence cases through Intake → Technical Review → Inspection →
//! Management. Every department works under a business-day deadline; a
//! periodic sweep flags the ones that slipped.
//!
//! # Key Principle
//!
//! **The engine decides, it NEVER performs side effects.**
//!
//! Operations validate against the stage graph and the role directory,
//! persist under a version guard, and hand back [`Intent`] values. The
//! caller routes them through an [`IntentDispatcher`].
//!
//! # Architecture
//!
//! The [`CaseEngine`] composes:
//!
//! - [`StageGraph`]: the fixed transition table
//! - [`BusinessCalendar`] and [`Clock`]: deadline arithmetic
//! - [`CaseStore`]: versioned persistence
//! - [`RoleDirectory`]: actor → role lookups
//! - [`StatisticsAggregator`]: read-side figures
//!
//! [`DeadlineSweeper`] runs the overdue sweep on an interval.
//!
//! # Example
//!
//! ```rust
//! use casework_engine::*;
//! use casework_types::*;
//! use std::sync::Arc;
//!
//! let roles = StaticRoleDirectory::new()
//!     .with_actor("clerk-1", &[Role::IntakeClerk])
//!     .with_actor("rev-1", &[Role::TechnicalReviewer]);
//! let engine = CaseEngine::new(
//!     Arc::new(InMemoryCaseStore::new()),
//!     Arc::new(roles),
//!     EngineConfig::default(),
//! );
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let draft = NewCase::new(
//!         Applicant::default(),
//!         Project::default(),
//!         ActorId::new("applicant-1"),
//!     );
//!     let (case, _intents) = engine.create_case(draft).await.unwrap();
//!
//!     // the intake clerk acts without an explicit assignment
//!     let (result, _intents) = engine
//!         .decide(DecideRequest::new(
//!             case.id.clone(),
//!             Department::Intake,
//!             ActorId::new("clerk-1"),
//!             Outcome::Accept,
//!         ))
//!         .await
//!         .unwrap();
//!     assert_eq!(result.next_department, Department::TechnicalReview);
//! });
//! ```
//!
//! [`Intent`]: casework_types::Intent

#![deny(unsafe_code)]

pub mod calendar;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod memory;
pub mod roles;
pub mod stage_graph;
pub mod statistics;
pub mod store;
pub mod sweeper;

// Re-export main types
pub use calendar::{BusinessCalendar, Clock, ManualClock, SystemClock};
pub use config::{DeadlineConfig, EngineConfig};
pub use dispatch::{
    ArtifactGenerator, DispatchError, DispatchReport, IntentDispatcher, IntentEnvelope, Notifier,
    RecordingNotifier, TracingArtifactGenerator, TracingNotifier,
};
pub use engine::{
    AssignRequest, AssignmentResult, CaseEngine, CaseUpdate, DecideRequest, DecisionResult,
};
pub use memory::InMemoryCaseStore;
pub use roles::{RoleDirectory, StaticRoleDirectory};
pub use stage_graph::StageGraph;
pub use statistics::{ActorStatistics, CaseFilter, StatisticsAggregator, StatisticsSnapshot};
pub use store::{CaseStore, StoreError, StoreResult, Version};
pub use sweeper::DeadlineSweeper;
