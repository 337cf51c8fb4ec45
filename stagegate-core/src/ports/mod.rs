//! Interfaces of the external systems a stage talks to.
//!
//! Client construction, credentials and regions are the host's concern; the
//! engine only sees these traits.

pub mod cluster;
pub mod launcher;
pub mod logs;
pub mod store;
pub mod topics;

pub use cluster::{ClusterApi, InstancePage, StepPage};
pub use launcher::LaunchInvoker;
pub use logs::{LogEventsPage, LogStore, LogStreamPage, StepLogSink};
pub use store::{
    AttributeValue, Item, ItemKey, ScanPage, ScanRequest, StatusStore, UpdateCondition,
};
pub use topics::{TopicPage, TopicPublisher};
