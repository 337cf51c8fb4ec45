use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use stagegate_model::{LogEvent, StepState, StepSummary};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::lifecycle::Cancellable;
use crate::poll::{PollCheck, PollOutcome, PollPolicy, Tick, poll_until};
use crate::ports::cluster::{ClusterApi, all_instances};
use crate::ports::{LogStore, StepLogSink};

/// Forwards step output to the tracing subscriber under `stage::step_output`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl StepLogSink for TracingLogSink {
    fn emit(&self, step_id: &str, event: &LogEvent) {
        info!(
            target: "stage::step_output",
            step_id,
            timestamp = event.timestamp,
            "{}",
            event.message
        );
    }
}

/// Consecutive `describe_step` failures after which a tail gives up.
const MAX_DESCRIBE_FAILURES: u32 = 3;

/// Tails the log stream of one cluster step until the step finishes.
pub struct LogStreamer {
    cluster: Arc<dyn ClusterApi>,
    logs: Arc<dyn LogStore>,
    sink: Arc<dyn StepLogSink>,
    log_group: Option<String>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl fmt::Debug for LogStreamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStreamer")
            .field("log_group", &self.log_group)
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl LogStreamer {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        logs: Arc<dyn LogStore>,
        sink: Arc<dyn StepLogSink>,
        log_group: Option<String>,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cluster,
            logs,
            sink,
            log_group: log_group.filter(|group| !group.trim().is_empty()),
            policy,
            cancel,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.log_group.is_some()
    }

    /// Blocks while the step is active, forwarding new output every tick.
    ///
    /// Returns the step's final state, or `None` when tailing is disabled,
    /// cancelled, ran past the step deadline, or the step could not be
    /// described several ticks in a row.
    #[instrument(level = "debug", skip(self))]
    pub async fn tail_step(
        &self,
        cluster_id: &str,
        step_id: &str,
    ) -> Option<StepState> {
        let group = self.log_group.as_deref()?;

        let mut check = LogTailCheck {
            streamer: self,
            group,
            cluster_id,
            step_id,
            stream: None,
            forward_token: None,
            describe_failures: 0,
        };
        match poll_until(self.policy, &self.cancel, &mut check).await {
            PollOutcome::Satisfied(Some(state)) => {
                debug!(target: "stage::logs", %state, "step left the active set");
                Some(state)
            }
            PollOutcome::Satisfied(None) => {
                warn!(
                    target: "stage::logs",
                    failures = MAX_DESCRIBE_FAILURES,
                    "step could not be described, handing back to the monitor"
                );
                None
            }
            PollOutcome::TimedOut => {
                warn!(target: "stage::logs", "stopped tailing step at its deadline");
                None
            }
            PollOutcome::Cancelled => {
                debug!(target: "stage::logs", "log tail cancelled");
                None
            }
        }
    }
}

impl Cancellable for LogStreamer {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct LogTailCheck<'a> {
    streamer: &'a LogStreamer,
    group: &'a str,
    cluster_id: &'a str,
    step_id: &'a str,
    stream: Option<String>,
    forward_token: Option<String>,
    describe_failures: u32,
}

impl LogTailCheck<'_> {
    /// Finds the stream written by one of the cluster's instances whose name
    /// mentions the step.
    async fn resolve_stream(&self, step: &StepSummary) -> Result<Option<String>> {
        let needle = if step.name.is_empty() {
            step.id.as_str()
        } else {
            step.name.as_str()
        };

        let cluster = self.streamer.cluster.as_ref();
        let instances = all_instances(cluster, self.cluster_id).await?;
        for instance in &instances {
            let mut token: Option<String> = None;
            loop {
                let page = self
                    .streamer
                    .logs
                    .describe_log_streams(self.group, instance, token.as_deref())
                    .await?;
                if let Some(name) = page
                    .stream_names
                    .into_iter()
                    .find(|name| name.contains(needle))
                {
                    return Ok(Some(name));
                }
                match page.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        }
        Ok(None)
    }

    /// Reads forward until the store hands back the token it was given.
    async fn drain(&mut self, stream: &str) -> Result<usize> {
        let mut forwarded = 0;
        loop {
            let page = self
                .streamer
                .logs
                .get_log_events(self.group, stream, self.forward_token.as_deref())
                .await?;
            for event in &page.events {
                self.streamer.sink.emit(self.step_id, event);
            }
            forwarded += page.events.len();

            match page.next_forward_token {
                Some(next) if self.forward_token.as_deref() != Some(next.as_str()) => {
                    self.forward_token = Some(next);
                }
                _ => return Ok(forwarded),
            }
        }
    }
}

#[async_trait]
impl PollCheck for LogTailCheck<'_> {
    /// `None` once the step has failed to describe too many times in a row.
    type Output = Option<StepState>;

    async fn check(&mut self) -> Tick<Option<StepState>> {
        let step = match self
            .streamer
            .cluster
            .describe_step(self.cluster_id, self.step_id)
            .await
        {
            Ok(step) => {
                self.describe_failures = 0;
                step
            }
            Err(err) => {
                self.describe_failures += 1;
                warn!(
                    target: "stage::logs",
                    error = %err,
                    failures = self.describe_failures,
                    "failed to describe step"
                );
                if self.describe_failures >= MAX_DESCRIBE_FAILURES {
                    return Tick::Ready(None);
                }
                return Tick::Pending;
            }
        };

        if self.stream.is_none() {
            match self.resolve_stream(&step).await {
                Ok(Some(stream)) => {
                    info!(target: "stage::logs", %stream, "tailing step log stream");
                    self.stream = Some(stream);
                }
                Ok(None) => {
                    debug!(
                        target: "stage::logs",
                        step = %step.name,
                        "no log stream for step yet"
                    );
                }
                Err(err) => {
                    warn!(
                        target: "stage::logs",
                        error = %err,
                        "failed to resolve step log stream"
                    );
                }
            }
        }

        // Drains after describing, so output written just before the step
        // finished is still forwarded on the last tick.
        if let Some(stream) = self.stream.clone() {
            match self.drain(&stream).await {
                Ok(0) => {}
                Ok(count) => {
                    debug!(target: "stage::logs", count, "forwarded step output")
                }
                Err(err) => warn!(
                    target: "stage::logs",
                    error = %err,
                    "failed to read step output"
                ),
            }
        }

        if step.state.is_active() {
            Tick::Pending
        } else {
            Tick::Ready(Some(step.state))
        }
    }
}
