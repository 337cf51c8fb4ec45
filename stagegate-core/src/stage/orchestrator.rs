use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use stagegate_model::LaunchPayload;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::StageConfig;
use crate::lifecycle::Cancellable;
use crate::ports::{
    ClusterApi, LaunchInvoker, LogStore, StatusStore, StepLogSink, TopicPublisher,
};
use crate::stage::dependency::{
    DependencyRequest, DependencyWaitEngine, DependencyWaiter,
};
use crate::stage::launch::{ClusterLauncher, LaunchInvocation};
use crate::stage::log_stream::LogStreamer;
use crate::stage::monitor::{ClusterObserver, ProgressMonitor};
use crate::stage::notify::{NotificationEmitter, StageNotifier};
use crate::stage::status::{StageStatusRecorder, StatusRecorder};

/// Parameters of one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub dependency: DependencyRequest,
    /// Known up front when the host already has the run's correlation id; the
    /// stage row is then written before the dependency wait begins.
    pub correlation_id: Option<String>,
}

impl StageRequest {
    pub fn new(dependency: DependencyRequest) -> Self {
        Self {
            dependency,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Clients for every external system a stage touches.
#[derive(Clone)]
pub struct StagePorts {
    pub store: Arc<dyn StatusStore>,
    pub launcher: Arc<dyn LaunchInvoker>,
    pub cluster: Arc<dyn ClusterApi>,
    pub logs: Arc<dyn LogStore>,
    pub topics: Arc<dyn TopicPublisher>,
    pub sink: Arc<dyn StepLogSink>,
}

impl fmt::Debug for StagePorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagePorts").finish_non_exhaustive()
    }
}

/// The pipeline's collaborators, each behind its own seam.
#[derive(Clone)]
pub struct StageComponents {
    pub waiter: Arc<dyn DependencyWaiter>,
    pub launcher: Arc<dyn ClusterLauncher>,
    pub monitor: Arc<dyn ClusterObserver>,
    pub recorder: Arc<dyn StageStatusRecorder>,
    pub notifier: Arc<dyn StageNotifier>,
}

impl fmt::Debug for StageComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageComponents")
            .field("waiter_cancelled", &self.waiter.is_cancelled())
            .field("launcher_cancelled", &self.launcher.is_cancelled())
            .field("monitor_cancelled", &self.monitor.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl StageComponents {
    /// Wires the default components. Every cancellable component gets a child
    /// of `root`, so cancelling the root reaches all of them.
    pub fn build(
        config: &StageConfig,
        stage_name: &str,
        ports: StagePorts,
        root: &CancellationToken,
    ) -> Self {
        let monitor_token = root.child_token();
        let streamer = LogStreamer::new(
            ports.cluster.clone(),
            ports.logs,
            ports.sink,
            config.log_group().map(str::to_string),
            config.log_policy(),
            monitor_token.child_token(),
        );
        let monitor = ProgressMonitor::new(
            ports.cluster,
            streamer,
            config.startup_policy(),
            config.step_policy(),
            monitor_token,
        )
        .with_discovery_grace(config.step_discovery_grace());

        Self {
            waiter: Arc::new(DependencyWaitEngine::new(
                config,
                ports.store.clone(),
                root.child_token(),
            )),
            launcher: Arc::new(LaunchInvocation::new(
                ports.launcher,
                config.launcher_function_name.clone(),
                root.child_token(),
            )),
            monitor: Arc::new(monitor),
            recorder: Arc::new(StatusRecorder::new(
                config,
                stage_name,
                ports.store,
            )),
            notifier: Arc::new(NotificationEmitter::new(
                config,
                Some(stage_name),
                ports.topics,
            )),
        }
    }
}

/// Runs one stage end to end and owns its cancellation.
///
/// Every run ends with exactly one terminal status write and exactly one
/// terminal notification, whatever fails along the way.
pub struct Orchestrator {
    components: StageComponents,
    cancel: CancellationToken,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("components", &self.components)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(components: StageComponents, cancel: CancellationToken) -> Self {
        Self { components, cancel }
    }

    pub fn from_ports(
        config: &StageConfig,
        stage_name: &str,
        ports: StagePorts,
    ) -> Self {
        let cancel = CancellationToken::new();
        let components = StageComponents::build(config, stage_name, ports, &cancel);
        Self::new(components, cancel)
    }

    /// Handle for hosts that want to cancel from elsewhere, e.g. a signal
    /// handler. Cancelling it stops every wait but does not call the
    /// components' own `cancel`; prefer [`Orchestrator::cancel`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the pipeline. Never panics; `false` on any failure.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            product = %request.dependency.data_product,
            export_date = %request.dependency.export_date
        )
    )]
    pub async fn run(&self, request: &StageRequest) -> bool {
        let pipeline = AssertUnwindSafe(self.pipeline(request)).catch_unwind();
        let succeeded = match pipeline.await {
            Ok(succeeded) => succeeded,
            Err(panic) => {
                error!(
                    target: "stage::orchestrator",
                    panic = panic_message(panic.as_ref()),
                    "stage pipeline panicked"
                );
                false
            }
        };

        let finish = AssertUnwindSafe(self.finish(succeeded)).catch_unwind();
        if let Err(panic) = finish.await {
            error!(
                target: "stage::orchestrator",
                panic = panic_message(panic.as_ref()),
                "recording the stage outcome panicked"
            );
        }
        succeeded
    }

    async fn pipeline(&self, request: &StageRequest) -> bool {
        let StageComponents {
            waiter,
            launcher,
            monitor,
            recorder,
            notifier,
        } = &self.components;

        notifier.notify_started().await;
        if let Some(correlation_id) = &request.correlation_id {
            recorder
                .register_started(correlation_id, &request.dependency.export_date)
                .await;
        }

        let dependency = match waiter.await_dependency(&request.dependency).await {
            Ok(Some(dependency)) => dependency,
            Ok(None) => {
                warn!(target: "stage::orchestrator", "dependency was not satisfied");
                return false;
            }
            Err(err) => {
                error!(
                    target: "stage::orchestrator",
                    error = %err,
                    "dependency wait failed"
                );
                return false;
            }
        };
        recorder.register_dependencies_completed(&dependency).await;

        let payload = LaunchPayload::from(&dependency);
        let Some(result) = launcher.invoke(&payload).await else {
            warn!(target: "stage::orchestrator", "launcher returned no result");
            return false;
        };
        if !result.successful() {
            warn!(
                target: "stage::orchestrator",
                status = result.http_status_code(),
                request_id = %result.request_id(),
                "launcher reported failure"
            );
            return false;
        }
        let Some(cluster_id) = result.usable_cluster_id() else {
            error!(
                target: "stage::orchestrator",
                request_id = %result.request_id(),
                "launcher succeeded without a cluster id"
            );
            return false;
        };

        info!(target: "stage::orchestrator", cluster_id, "cluster launched");
        recorder.register_cluster_id(cluster_id).await;
        monitor.observe(cluster_id).await
    }

    async fn finish(&self, succeeded: bool) {
        let StageComponents {
            recorder, notifier, ..
        } = &self.components;
        if succeeded {
            info!(target: "stage::orchestrator", "stage succeeded");
            recorder.register_success().await;
            notifier.notify_succeeded().await;
        } else {
            warn!(target: "stage::orchestrator", "stage failed");
            recorder.register_failure().await;
            notifier.notify_failed().await;
        }
    }
}

impl Cancellable for Orchestrator {
    /// Cancels the root token, then each component. Returns without waiting
    /// for in-flight polls to notice.
    fn cancel(&self) {
        info!(target: "stage::orchestrator", "cancelling stage");
        self.cancel.cancel();
        self.components.waiter.cancel();
        self.components.launcher.cancel();
        self.components.monitor.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
