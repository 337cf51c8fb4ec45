use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagegate_model::{ClusterState, StepState, StepSummary};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StageError;
use crate::lifecycle::Cancellable;
use crate::poll::{PollCheck, PollOutcome, PollPolicy, Tick, poll_until};
use crate::ports::cluster::{ClusterApi, all_steps};
use crate::stage::log_stream::LogStreamer;

#[async_trait]
pub trait ClusterObserver: Cancellable {
    /// True iff the cluster reached `RUNNING` and every step then finished
    /// `COMPLETED`.
    async fn observe(&self, cluster_id: &str) -> bool;
}

const DEFAULT_DISCOVERY_GRACE: Duration = Duration::from_secs(5 * 60);

/// Two-phase supervisor: waits for the cluster to boot, then for every step
/// to leave the active set, tailing the first active step's output meanwhile.
pub struct ProgressMonitor {
    cluster: Arc<dyn ClusterApi>,
    streamer: LogStreamer,
    startup_policy: PollPolicy,
    step_policy: PollPolicy,
    discovery_grace: Duration,
    cancel: CancellationToken,
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("streamer", &self.streamer)
            .field("startup_policy", &self.startup_policy)
            .field("step_policy", &self.step_policy)
            .field("discovery_grace", &self.discovery_grace)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ProgressMonitor {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        streamer: LogStreamer,
        startup_policy: PollPolicy,
        step_policy: PollPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cluster,
            streamer,
            startup_policy,
            step_policy,
            discovery_grace: DEFAULT_DISCOVERY_GRACE,
            cancel,
        }
    }

    /// How long an empty step list is tolerated once the cluster runs.
    pub fn with_discovery_grace(mut self, grace: Duration) -> Self {
        self.discovery_grace = grace;
        self
    }

    /// Phase one. `Some(state)` is the state that ended the phase.
    async fn await_startup(&self, cluster_id: &str) -> Option<ClusterState> {
        let mut check = StartupCheck {
            cluster: self.cluster.as_ref(),
            cluster_id,
        };
        match poll_until(self.startup_policy, &self.cancel, &mut check).await {
            PollOutcome::Satisfied(Ok(state)) => Some(state),
            PollOutcome::Satisfied(Err(err)) => {
                error!(
                    target: "stage::monitor",
                    error = %err,
                    "failed to describe cluster"
                );
                None
            }
            PollOutcome::TimedOut => {
                warn!(
                    target: "stage::monitor",
                    timeout_ms = self.startup_policy.timeout.as_millis() as u64,
                    "cluster did not start before its deadline"
                );
                None
            }
            PollOutcome::Cancelled => {
                info!(target: "stage::monitor", "startup wait cancelled");
                None
            }
        }
    }

    /// Phase two. Returns the final step list once nothing is active; the
    /// list is empty when no step showed up within the discovery grace.
    async fn await_steps(&self, cluster_id: &str) -> Option<Vec<StepSummary>> {
        let mut check = StepCheck {
            cluster: self.cluster.as_ref(),
            streamer: &self.streamer,
            cluster_id,
            started: Instant::now(),
            discovery_grace: self.discovery_grace,
        };
        match poll_until(self.step_policy, &self.cancel, &mut check).await {
            PollOutcome::Satisfied(steps) => Some(steps),
            PollOutcome::TimedOut => {
                warn!(
                    target: "stage::monitor",
                    timeout_ms = self.step_policy.timeout.as_millis() as u64,
                    "steps did not finish before their deadline"
                );
                None
            }
            PollOutcome::Cancelled => {
                info!(target: "stage::monitor", "step wait cancelled");
                None
            }
        }
    }
}

impl Cancellable for ProgressMonitor {
    fn cancel(&self) {
        self.cancel.cancel();
        self.streamer.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl ClusterObserver for ProgressMonitor {
    #[instrument(level = "info", skip(self))]
    async fn observe(&self, cluster_id: &str) -> bool {
        if self.cancel.is_cancelled() {
            info!(target: "stage::monitor", "cancelled before observing cluster");
            return false;
        }

        let Some(state) = self.await_startup(cluster_id).await else {
            return false;
        };
        if !state.accepts_steps() {
            warn!(
                target: "stage::monitor",
                %state,
                "cluster ended without reaching RUNNING"
            );
            return false;
        }
        info!(target: "stage::monitor", "cluster is running, watching steps");

        let Some(steps) = self.await_steps(cluster_id).await else {
            return false;
        };
        if steps.is_empty() {
            warn!(
                target: "stage::monitor",
                grace_ms = self.discovery_grace.as_millis() as u64,
                "no steps were submitted to the cluster"
            );
            return false;
        }

        let mut succeeded = true;
        for step in steps.iter().filter(|step| step.state != StepState::Completed) {
            warn!(
                target: "stage::monitor",
                step_id = %step.id,
                step = %step.name,
                state = %step.state,
                "step did not complete"
            );
            succeeded = false;
        }
        if succeeded {
            info!(
                target: "stage::monitor",
                steps = steps.len(),
                "all steps completed"
            );
        }
        succeeded
    }
}

struct StartupCheck<'a> {
    cluster: &'a dyn ClusterApi,
    cluster_id: &'a str,
}

#[async_trait]
impl PollCheck for StartupCheck<'_> {
    type Output = Result<ClusterState, StageError>;

    async fn check(&mut self) -> Tick<Self::Output> {
        match self.cluster.describe_cluster(self.cluster_id).await {
            Ok(description) => {
                let state = description.state;
                if state.accepts_steps() || state.is_completed() {
                    Tick::Ready(Ok(state))
                } else {
                    debug!(target: "stage::monitor", %state, "cluster still starting");
                    Tick::Pending
                }
            }
            Err(err) => Tick::Ready(Err(err)),
        }
    }
}

struct StepCheck<'a> {
    cluster: &'a dyn ClusterApi,
    streamer: &'a LogStreamer,
    cluster_id: &'a str,
    started: Instant,
    discovery_grace: Duration,
}

#[async_trait]
impl PollCheck for StepCheck<'_> {
    type Output = Vec<StepSummary>;

    async fn check(&mut self) -> Tick<Vec<StepSummary>> {
        let steps = match all_steps(self.cluster, self.cluster_id).await {
            Ok(steps) => steps,
            Err(err) => {
                warn!(
                    target: "stage::monitor",
                    error = %err,
                    "failed to list steps"
                );
                return Tick::Pending;
            }
        };
        if steps.is_empty() {
            if self.started.elapsed() >= self.discovery_grace {
                return Tick::Ready(steps);
            }
            debug!(target: "stage::monitor", "no steps submitted yet");
            return Tick::Pending;
        }

        match steps.iter().find(|step| step.state.is_active()) {
            Some(active) => {
                debug!(
                    target: "stage::monitor",
                    step_id = %active.id,
                    state = %active.state,
                    "step in progress"
                );
                if self.streamer.is_enabled() {
                    self.streamer.tail_step(self.cluster_id, &active.id).await;
                }
                Tick::Pending
            }
            None => Tick::Ready(steps),
        }
    }
}
