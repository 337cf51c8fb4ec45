//! The stage pipeline and its components.
//!
//! Leaves first: [`dependency`] gates the launch on upstream status,
//! [`launch`] provisions the cluster, [`monitor`] supervises boot and steps
//! (tailing output through [`log_stream`]), [`status`] and [`notify`] report
//! progress, and [`orchestrator`] strings them together.

pub mod dependency;
pub mod launch;
pub mod log_stream;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod status;

pub use dependency::{DependencyRequest, DependencyWaitEngine, DependencyWaiter};
pub use launch::{ClusterLauncher, LaunchInvocation};
pub use log_stream::{LogStreamer, TracingLogSink};
pub use monitor::{ClusterObserver, ProgressMonitor};
pub use notify::{NotificationEmitter, StageNotifier};
pub use orchestrator::{Orchestrator, StageComponents, StagePorts, StageRequest};
pub use status::{StageStatusRecorder, StatusRecorder, namespaced_product};
