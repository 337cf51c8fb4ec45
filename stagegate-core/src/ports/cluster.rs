use async_trait::async_trait;
use stagegate_model::{ClusterDescription, StepSummary};

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPage {
    pub steps: Vec<StepSummary>,
    pub marker: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePage {
    pub instance_ids: Vec<String>,
    pub marker: Option<String>,
}

/// Read-only view of a compute cluster and the steps submitted to it.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn describe_cluster(&self, cluster_id: &str) -> Result<ClusterDescription>;

    async fn list_steps(
        &self,
        cluster_id: &str,
        marker: Option<&str>,
    ) -> Result<StepPage>;

    async fn describe_step(
        &self,
        cluster_id: &str,
        step_id: &str,
    ) -> Result<StepSummary>;

    async fn list_instances(
        &self,
        cluster_id: &str,
        marker: Option<&str>,
    ) -> Result<InstancePage>;
}

/// Collects every step of a cluster across pages.
pub async fn all_steps(
    api: &dyn ClusterApi,
    cluster_id: &str,
) -> Result<Vec<StepSummary>> {
    let mut steps = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let page = api.list_steps(cluster_id, marker.as_deref()).await?;
        steps.extend(page.steps);
        match page.marker {
            Some(next) => marker = Some(next),
            None => return Ok(steps),
        }
    }
}

/// Collects every member instance id of a cluster across pages.
pub async fn all_instances(
    api: &dyn ClusterApi,
    cluster_id: &str,
) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let page = api.list_instances(cluster_id, marker.as_deref()).await?;
        ids.extend(page.instance_ids);
        match page.marker {
            Some(next) => marker = Some(next),
            None => return Ok(ids),
        }
    }
}
