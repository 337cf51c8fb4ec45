//! # Stagegate Core
//!
//! Engine for a dependency-gated cluster job stage: wait for upstream stages
//! to finish in the shared status store, launch a compute cluster through an
//! external launcher, then supervise the cluster's boot and steps to a single
//! success or failure outcome.
//!
//! ## Architecture
//!
//! - [`poll`]: the one poll-until-ready primitive every wait is built on
//! - [`ports`]: traits for the status store, launcher, cluster service, log
//!   store and notification topics
//! - [`infra`]: in-memory and HTTP implementations of some ports
//! - [`stage`]: the pipeline components and the [`Orchestrator`]
//! - [`config`]: timing and naming knobs ([`StageConfig`])
//!
//! Cancellation flows through [`tokio_util::sync::CancellationToken`]s: the
//! orchestrator owns the root and hands a child to each component.
//!
//! ## Examples
//!
//! ```no_run
//! use stagegate_core::{
//!     DependencyRequest, Orchestrator, StageConfig, StagePorts, StageRequest,
//! };
//!
//! async fn run_stage(ports: StagePorts) -> bool {
//!     let config = StageConfig::default();
//!     let orchestrator = Orchestrator::from_ports(&config, "adg-emr", ports);
//!     let request = StageRequest::new(
//!         DependencyRequest::product("ADG-full", "2024-05-01"),
//!     );
//!     orchestrator.run(&request).await
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod infra;
pub mod lifecycle;
pub mod poll;
pub mod ports;
pub mod stage;

pub use config::{ConfigValidationError, StageConfig};
pub use error::{Result, StageError};
pub use lifecycle::Cancellable;
pub use poll::{PollCheck, PollOutcome, PollPolicy, Tick, poll_until};
pub use stage::{
    ClusterLauncher, ClusterObserver, DependencyRequest, DependencyWaiter, Orchestrator,
    StageComponents, StageNotifier, StagePorts, StageRequest, StageStatusRecorder,
};
