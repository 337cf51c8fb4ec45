//! Poll-until-condition primitive shared by every wait in a stage.
//!
//! A wait ends in exactly one of three ways: the check reports a value, the
//! deadline passes, or the cancellation token fires. The check itself is raced
//! against the deadline and the token, so a check that blocks for a long time
//! (log tailing inside the step phase) is abandoned as soon as either fires.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Cadence and deadline of a single wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    Ready(T),
    Pending,
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Satisfied(T),
    TimedOut,
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn satisfied(self) -> Option<T> {
        match self {
            Self::Satisfied(value) => Some(value),
            Self::TimedOut | Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// A recurring check driven by [`poll_until`].
///
/// Transient failures inside a check should be logged and reported as
/// [`Tick::Pending`]; the next tick simply tries again.
#[async_trait]
pub trait PollCheck: Send {
    type Output: Send;

    async fn check(&mut self) -> Tick<Self::Output>;
}

/// Runs `check` every `policy.interval`, starting immediately, until it is
/// ready, `policy.timeout` elapses, or `cancel` fires.
pub async fn poll_until<C>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    check: &mut C,
) -> PollOutcome<C::Output>
where
    C: PollCheck,
{
    if cancel.is_cancelled() {
        return PollOutcome::Cancelled;
    }

    let deadline = time::sleep(policy.timeout);
    tokio::pin!(deadline);

    let mut ticker = time::interval(policy.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = &mut deadline => {
                trace!(target: "stage::poll", ticks, "deadline reached");
                return PollOutcome::TimedOut;
            }
            _ = ticker.tick() => {}
        }

        ticks += 1;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = &mut deadline => {
                trace!(target: "stage::poll", ticks, "deadline reached during check");
                return PollOutcome::TimedOut;
            }
            tick = check.check() => {
                if let Tick::Ready(value) = tick {
                    trace!(target: "stage::poll", ticks, "condition satisfied");
                    return PollOutcome::Satisfied(value);
                }
            }
        }
    }
}
