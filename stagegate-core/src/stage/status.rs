use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use stagegate_model::{DependencyRecord, DependencyStatus, fields};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::StageConfig;
use crate::error::Result;
use crate::ports::store::{
    Item, ItemKey, StatusStore, UpdateCondition, encode_dependency,
};

/// Writes this stage's own lifecycle row.
///
/// Every method is fire-and-forget: failures are logged and swallowed so a
/// store outage never changes the pipeline outcome.
#[async_trait]
pub trait StageStatusRecorder: Send + Sync {
    async fn register_started(&self, correlation_id: &str, export_date: &str);

    async fn register_dependencies_completed(&self, dependency: &DependencyRecord);

    async fn register_cluster_id(&self, cluster_id: &str);

    async fn register_success(&self);

    async fn register_failure(&self);
}

pub struct StatusRecorder {
    store: Arc<dyn StatusStore>,
    table: String,
    product_name: String,
    ttl: Duration,
    /// Correlation id of the current run, learned from whichever write
    /// first carries it.
    correlation_id: Mutex<Option<String>>,
}

impl fmt::Debug for StatusRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusRecorder")
            .field("table", &self.table)
            .field("product_name", &self.product_name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// `<NAMESPACE>_<STAGE>`, the product name this stage records itself under.
pub fn namespaced_product(namespace: &str, stage_name: &str) -> String {
    format!("{namespace}_{}", stage_name.to_uppercase())
}

impl StatusRecorder {
    pub fn new(
        config: &StageConfig,
        stage_name: &str,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            store,
            table: config.status_table_name.clone(),
            product_name: namespaced_product(&config.product_namespace, stage_name),
            ttl: config.status_ttl(),
            correlation_id: Mutex::new(None),
        }
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    fn expires_at(&self) -> i64 {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_add(ttl)
    }

    async fn remember(&self, correlation_id: &str) {
        *self.correlation_id.lock().await = Some(correlation_id.to_string());
    }

    async fn item_key(&self) -> Option<ItemKey> {
        self.correlation_id
            .lock()
            .await
            .as_ref()
            .map(|correlation_id| ItemKey::status(correlation_id, &self.product_name))
    }

    async fn put(&self, record: DependencyRecord) -> Result<()> {
        self.store
            .put_item(&self.table, encode_dependency(&record))
            .await
    }

    async fn update(&self, field: &str, value: &str) -> Result<()> {
        let Some(key) = self.item_key().await else {
            warn!(
                target: "stage::status",
                product = %self.product_name,
                field,
                "no correlation id known, skipping status update"
            );
            return Ok(());
        };
        let mut updates = Item::new();
        updates.insert(field.to_string(), value.into());
        self.store
            .update_item(&self.table, &key, updates, UpdateCondition::ItemExists)
            .await
    }

    fn report(&self, operation: &'static str, result: Result<()>) {
        match result {
            Ok(()) => debug!(
                target: "stage::status",
                operation,
                product = %self.product_name,
                "status recorded"
            ),
            Err(err) => warn!(
                target: "stage::status",
                operation,
                product = %self.product_name,
                error = %err,
                "failed to record stage status"
            ),
        }
    }
}

#[async_trait]
impl StageStatusRecorder for StatusRecorder {
    #[instrument(level = "debug", skip(self))]
    async fn register_started(&self, correlation_id: &str, export_date: &str) {
        self.remember(correlation_id).await;
        let mut record = DependencyRecord::new(
            correlation_id,
            &self.product_name,
            export_date,
            DependencyStatus::Starting,
        );
        record.time_to_live = Some(self.expires_at());
        let result = self.put(record).await;
        self.report("started", result);
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(correlation_id = %dependency.correlation_id)
    )]
    async fn register_dependencies_completed(&self, dependency: &DependencyRecord) {
        self.remember(&dependency.correlation_id).await;
        let record = DependencyRecord {
            correlation_id: dependency.correlation_id.clone(),
            data_product: self.product_name.clone(),
            export_date: dependency.export_date.clone(),
            status: DependencyStatus::Started,
            cluster_id: None,
            snapshot_type: dependency.snapshot_type.clone(),
            dataset_prefix: dependency.dataset_prefix.clone(),
            snapshots_prefix: dependency.snapshots_prefix.clone(),
            time_to_live: Some(self.expires_at()),
        };
        let result = self.put(record).await;
        self.report("dependencies_completed", result);
    }

    async fn register_cluster_id(&self, cluster_id: &str) {
        let result = self.update(fields::CLUSTER_ID, cluster_id).await;
        self.report("cluster_id", result);
    }

    async fn register_success(&self) {
        let result = self.update(fields::STATUS, fields::STATUS_COMPLETED).await;
        self.report("success", result);
    }

    async fn register_failure(&self) {
        let result = self.update(fields::STATUS, fields::STATUS_FAILED).await;
        self.report("failure", result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryStatusStore;
    use crate::ports::store::{decode_dependency, string_field};

    fn recorder() -> (Arc<MemoryStatusStore>, StatusRecorder) {
        let config = StageConfig::default();
        let store = Arc::new(MemoryStatusStore::for_config(&config));
        let recorder = StatusRecorder::new(&config, "adg-emr", store.clone());
        (store, recorder)
    }

    async fn own_row(store: &MemoryStatusStore, correlation_id: &str) -> Option<Item> {
        store
            .get_item(
                "data_pipeline_metadata",
                &ItemKey::status(correlation_id, "PIPELINE_ADG-EMR"),
            )
            .await
            .unwrap()
    }

    fn upstream() -> DependencyRecord {
        let mut record = DependencyRecord::new(
            "corr-9",
            "ADG-full",
            "2024-05-01",
            DependencyStatus::Completed,
        );
        record.dataset_prefix = Some("analytical/2024-05-01".into());
        record.snapshot_type = Some("full".into());
        record
    }

    #[test]
    fn product_name_is_namespaced_and_uppercased() {
        assert_eq!(namespaced_product("PIPELINE", "adg-emr"), "PIPELINE_ADG-EMR");
    }

    #[tokio::test]
    async fn lifecycle_writes_land_on_own_row() {
        let (store, recorder) = recorder();
        let before = Utc::now().timestamp();

        recorder.register_started("corr-9", "2024-05-01").await;
        let row = own_row(&store, "corr-9").await.unwrap();
        assert_eq!(string_field(&row, fields::STATUS), Some("Starting"));

        recorder.register_dependencies_completed(&upstream()).await;
        recorder.register_cluster_id("j-123").await;
        recorder.register_success().await;

        let record = decode_dependency(&own_row(&store, "corr-9").await.unwrap()).unwrap();
        assert_eq!(record.data_product, "PIPELINE_ADG-EMR");
        assert_eq!(record.export_date, "2024-05-01");
        assert_eq!(record.status, DependencyStatus::Completed);
        assert_eq!(record.cluster_id.as_deref(), Some("j-123"));
        assert_eq!(record.dataset_prefix.as_deref(), Some("analytical/2024-05-01"));
        assert_eq!(record.snapshot_type.as_deref(), Some("full"));

        let ttl = record.time_to_live.unwrap();
        assert!(ttl >= before + 30 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn updates_without_a_known_stage_are_skipped() {
        let (store, recorder) = recorder();
        recorder.register_cluster_id("j-1").await;
        recorder.register_failure().await;
        assert!(own_row(&store, "corr-9").await.is_none());
    }

    #[tokio::test]
    async fn failed_conditional_update_is_swallowed() {
        let (store, recorder) = recorder();
        recorder.remember("corr-9").await;

        recorder.register_failure().await;
        assert!(own_row(&store, "corr-9").await.is_none());
    }

    #[tokio::test]
    async fn oversized_ttl_saturates_the_expiry() {
        let config = StageConfig {
            status_ttl_days: 200_000_000_000_000,
            ..StageConfig::default()
        };
        let store = Arc::new(MemoryStatusStore::for_config(&config));
        let recorder = StatusRecorder::new(&config, "adg-emr", store.clone());

        recorder.register_started("corr-9", "2024-05-01").await;

        let row = own_row(&store, "corr-9").await.unwrap();
        let record = decode_dependency(&row).unwrap();
        assert_eq!(record.time_to_live, Some(i64::MAX));
    }
}
