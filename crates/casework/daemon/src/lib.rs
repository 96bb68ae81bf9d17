//! Casework Daemon library
//!
//! This module provides the host process around the case engine:
//! - Configuration loading (file and environment)
//! - Case store construction and JSON snapshots
//! - Deadline sweeper lifecycle with graceful shutdown

pub mod config;
pub mod error;
pub mod server;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use server::Daemon;
