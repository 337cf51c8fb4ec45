//! Scripted cluster service and an empty log store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use stagegate_core::ports::{
    ClusterApi, InstancePage, LogEventsPage, LogStore, LogStreamPage, StepPage,
};
use stagegate_core::{Result, StageError};
use stagegate_model::{ClusterDescription, ClusterState, StepState, StepSummary};

/// Pops one scripted answer per call and keeps repeating the last one.
fn advance<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Default)]
pub struct ScriptedCluster {
    states: Mutex<VecDeque<ClusterState>>,
    step_lists: Mutex<VecDeque<Vec<StepSummary>>>,
    describe_fails: bool,
    step_describe_fails: bool,
    describe_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl ScriptedCluster {
    pub fn new(states: impl IntoIterator<Item = ClusterState>) -> Self {
        Self {
            states: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn failing_describe() -> Self {
        Self {
            describe_fails: true,
            ..Self::default()
        }
    }

    /// Successive answers to `list_steps`.
    pub fn with_steps(self, lists: impl IntoIterator<Item = Vec<StepSummary>>) -> Self {
        *self.step_lists.lock().unwrap() = lists.into_iter().collect();
        self
    }

    /// Makes every `describe_step` call fail.
    pub fn failing_step_describe(mut self) -> Self {
        self.step_describe_fails = true;
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

pub fn step(id: &str, state: StepState) -> StepSummary {
    StepSummary::new(id, format!("step-{id}"), state)
}

#[async_trait]
impl ClusterApi for ScriptedCluster {
    async fn describe_cluster(&self, cluster_id: &str) -> Result<ClusterDescription> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.describe_fails {
            return Err(StageError::Cluster(format!("{cluster_id}: access denied")));
        }
        let state = advance(&self.states)
            .ok_or_else(|| StageError::Cluster(format!("{cluster_id} not scripted")))?;
        Ok(ClusterDescription {
            id: cluster_id.to_string(),
            name: "stage-cluster".to_string(),
            state,
        })
    }

    async fn list_steps(&self, _cluster_id: &str, _marker: Option<&str>) -> Result<StepPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StepPage {
            steps: advance(&self.step_lists).unwrap_or_default(),
            marker: None,
        })
    }

    async fn describe_step(&self, _cluster_id: &str, step_id: &str) -> Result<StepSummary> {
        if self.step_describe_fails {
            return Err(StageError::Cluster(format!("{step_id}: access denied")));
        }
        let current = self.step_lists.lock().unwrap().front().cloned();
        current
            .unwrap_or_default()
            .into_iter()
            .find(|step| step.id == step_id)
            .ok_or_else(|| StageError::Cluster(format!("no step {step_id}")))
    }

    async fn list_instances(
        &self,
        _cluster_id: &str,
        _marker: Option<&str>,
    ) -> Result<InstancePage> {
        Ok(InstancePage::default())
    }
}

/// Log store without any streams.
#[derive(Debug, Default)]
pub struct EmptyLogs;

#[async_trait]
impl LogStore for EmptyLogs {
    async fn describe_log_streams(
        &self,
        _group: &str,
        _prefix: &str,
        _next_token: Option<&str>,
    ) -> Result<LogStreamPage> {
        Ok(LogStreamPage::default())
    }

    async fn get_log_events(
        &self,
        _group: &str,
        _stream: &str,
        forward_token: Option<&str>,
    ) -> Result<LogEventsPage> {
        Ok(LogEventsPage {
            events: Vec::new(),
            next_forward_token: forward_token.map(str::to_string),
        })
    }
}
