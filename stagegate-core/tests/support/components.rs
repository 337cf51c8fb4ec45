//! Recording stand-ins for the pipeline components.
//!
//! Every stub appends to one shared [`CallLog`] so tests can assert both
//! which components were reached and in what order.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stagegate_core::{
    Cancellable, ClusterLauncher, ClusterObserver, DependencyRequest, DependencyWaiter, Result,
    StageComponents, StageError, StageNotifier, StageStatusRecorder,
};
use stagegate_model::{
    DependencyRecord, DependencyStatus, LaunchPayload, LaunchResult, ResponseMetadata,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|entry| *entry == call).count()
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.calls().iter().any(|entry| entry.starts_with(prefix))
    }
}

/// What a stub does when it is reached.
#[derive(Clone, Debug)]
pub enum Script<T> {
    Return(T),
    Fail,
    Panic,
}

pub fn completed_dependency() -> DependencyRecord {
    let mut record = DependencyRecord::new(
        "corr-1",
        "ADG-full",
        "2024-05-01",
        DependencyStatus::Completed,
    );
    record.snapshots_prefix = Some("snapshots/2024-05-01".into());
    record
}

pub fn launch_result(cluster_id: Option<&str>, http_status_code: u16) -> LaunchResult {
    LaunchResult {
        cluster_id: cluster_id.map(str::to_string),
        cluster_arn: None,
        metadata: ResponseMetadata {
            request_id: "req-1".into(),
            http_status_code,
            retry_attempts: 0,
        },
    }
}

pub struct StubWaiter {
    script: Script<Option<DependencyRecord>>,
    log: CallLog,
    cancel: CancellationToken,
}

impl Cancellable for StubWaiter {
    fn cancel(&self) {
        self.log.push("cancel:waiter");
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl DependencyWaiter for StubWaiter {
    async fn await_dependency(
        &self,
        request: &DependencyRequest,
    ) -> Result<Option<DependencyRecord>> {
        self.log.push(format!("await_dependency:{}", request.data_product));
        match &self.script {
            Script::Return(record) => Ok(record.clone()),
            Script::Fail => Err(StageError::Store("scan rejected".into())),
            Script::Panic => panic!("dependency store client blew up"),
        }
    }
}

pub struct StubLauncher {
    script: Script<LaunchResult>,
    log: CallLog,
    cancel: CancellationToken,
}

impl Cancellable for StubLauncher {
    fn cancel(&self) {
        self.log.push("cancel:launcher");
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl ClusterLauncher for StubLauncher {
    async fn invoke(&self, payload: &LaunchPayload) -> Option<LaunchResult> {
        self.log.push(format!("invoke:{}", payload.correlation_id()));
        match &self.script {
            Script::Return(result) => Some(result.clone()),
            Script::Fail => None,
            Script::Panic => panic!("launcher client blew up"),
        }
    }
}

pub struct StubMonitor {
    script: Script<bool>,
    log: CallLog,
    cancel: CancellationToken,
}

impl Cancellable for StubMonitor {
    fn cancel(&self) {
        self.log.push("cancel:monitor");
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl ClusterObserver for StubMonitor {
    async fn observe(&self, cluster_id: &str) -> bool {
        self.log.push(format!("observe:{cluster_id}"));
        match &self.script {
            Script::Return(succeeded) => *succeeded,
            Script::Fail => false,
            Script::Panic => panic!("cluster client blew up"),
        }
    }
}

pub struct RecordingRecorder {
    log: CallLog,
}

#[async_trait]
impl StageStatusRecorder for RecordingRecorder {
    async fn register_started(&self, correlation_id: &str, _export_date: &str) {
        self.log.push(format!("register_started:{correlation_id}"));
    }

    async fn register_dependencies_completed(&self, dependency: &DependencyRecord) {
        self.log.push(format!(
            "register_dependencies_completed:{}",
            dependency.correlation_id
        ));
    }

    async fn register_cluster_id(&self, cluster_id: &str) {
        self.log.push(format!("register_cluster_id:{cluster_id}"));
    }

    async fn register_success(&self) {
        self.log.push("register_success");
    }

    async fn register_failure(&self) {
        self.log.push("register_failure");
    }
}

pub struct RecordingNotifier {
    log: CallLog,
}

#[async_trait]
impl StageNotifier for RecordingNotifier {
    async fn notify_started(&self) {
        self.log.push("notify_started");
    }

    async fn notify_succeeded(&self) {
        self.log.push("notify_succeeded");
    }

    async fn notify_failed(&self) {
        self.log.push("notify_failed");
    }
}

/// Scripts for one orchestrator run; defaults describe the happy path.
#[derive(Clone, Debug)]
pub struct StubPlan {
    pub dependency: Script<Option<DependencyRecord>>,
    pub launch: Script<LaunchResult>,
    pub observe: Script<bool>,
}

impl Default for StubPlan {
    fn default() -> Self {
        Self {
            dependency: Script::Return(Some(completed_dependency())),
            launch: Script::Return(launch_result(Some("j-123"), 200)),
            observe: Script::Return(true),
        }
    }
}

impl StubPlan {
    pub fn build(self, log: &CallLog, root: &CancellationToken) -> StageComponents {
        StageComponents {
            waiter: Arc::new(StubWaiter {
                script: self.dependency,
                log: log.clone(),
                cancel: root.child_token(),
            }),
            launcher: Arc::new(StubLauncher {
                script: self.launch,
                log: log.clone(),
                cancel: root.child_token(),
            }),
            monitor: Arc::new(StubMonitor {
                script: self.observe,
                log: log.clone(),
                cancel: root.child_token(),
            }),
            recorder: Arc::new(RecordingRecorder { log: log.clone() }),
            notifier: Arc::new(RecordingNotifier { log: log.clone() }),
        }
    }
}
