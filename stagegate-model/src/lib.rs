//! Core data model definitions shared across stagegate crates.
//!
//! The types here describe the records a stage reads from and writes to the
//! shared status store, the payload handed to the external cluster launcher,
//! and the lifecycle states reported by the compute cluster.
#![allow(missing_docs)]

pub mod cluster;
pub mod collection;
pub mod dependency;
pub mod error;
pub mod fields;
pub mod launch;
pub mod logs;
pub mod notification;

// Intentionally curated re-exports for downstream consumers.
pub use cluster::{ClusterDescription, ClusterState, StepState, StepSummary};
pub use collection::CollectionStatus;
pub use dependency::{DependencyRecord, DependencyStatus};
pub use error::{ModelError, Result as ModelResult};
pub use launch::{LaunchPayload, LaunchResult, NOT_SET, ResponseMetadata};
pub use logs::LogEvent;
pub use notification::{NotificationMessage, NotificationType, Severity};
