//! Configuration loading for stagegate hosts.
//!
//! Hosts resolve a [`StageSettings`] once at startup, hand its
//! [`StageConfig`](stagegate_core::StageConfig) to the orchestrator, and call
//! [`telemetry::init_tracing`] before anything logs.

pub mod settings;
pub mod telemetry;

pub use settings::{StageConfigSource, StageSettings};
