use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use stagegate_model::{CollectionStatus, DependencyRecord, fields};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::StageConfig;
use crate::error::Result;
use crate::lifecycle::Cancellable;
use crate::poll::{PollCheck, PollOutcome, PollPolicy, Tick, poll_until};
use crate::ports::store::{
    ItemKey, ScanRequest, StatusStore, decode_dependency, find_first, string_field,
};

/// Upstream stage this stage is gated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub data_product: String,
    pub export_date: String,
    /// When non-empty, each named sub-collection must succeed instead of the
    /// product-level record.
    pub collections: Vec<String>,
}

impl DependencyRequest {
    pub fn product(
        data_product: impl Into<String>,
        export_date: impl Into<String>,
    ) -> Self {
        Self {
            data_product: data_product.into(),
            export_date: export_date.into(),
            collections: Vec::new(),
        }
    }

    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
pub trait DependencyWaiter: Cancellable {
    /// Waits for the dependency to succeed and returns its record, or `None`
    /// when it failed, timed out, or the wait was cancelled.
    async fn await_dependency(
        &self,
        request: &DependencyRequest,
    ) -> Result<Option<DependencyRecord>>;
}

/// Polls the status store until an upstream dependency reaches a terminal
/// state.
pub struct DependencyWaitEngine {
    store: Arc<dyn StatusStore>,
    status_table: String,
    collection_table: String,
    product_policy: PollPolicy,
    collection_policy: PollPolicy,
    cancel: CancellationToken,
}

impl fmt::Debug for DependencyWaitEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyWaitEngine")
            .field("status_table", &self.status_table)
            .field("collection_table", &self.collection_table)
            .field("product_policy", &self.product_policy)
            .field("collection_policy", &self.collection_policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl DependencyWaitEngine {
    pub fn new(
        config: &StageConfig,
        store: Arc<dyn StatusStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            status_table: config.status_table_name.clone(),
            collection_table: config.collection_status_table_name.clone(),
            product_policy: config.product_policy(),
            collection_policy: config.collection_policy(),
            cancel,
        }
    }

    fn scan_request(&self, request: &DependencyRequest) -> ScanRequest {
        ScanRequest::new(&self.status_table)
            .filter(fields::DATA_PRODUCT, &request.data_product)
            .filter(fields::DATE, &request.export_date)
    }

    /// Waits until the product record exists (and, when `goal` asks for it,
    /// carries a terminal status).
    async fn await_record(
        &self,
        request: &DependencyRequest,
        goal: LookupGoal,
    ) -> PollOutcome<DependencyRecord> {
        let mut check = RecordCheck {
            store: self.store.as_ref(),
            status_table: &self.status_table,
            scan: self.scan_request(request),
            key: None,
            goal,
        };
        poll_until(self.product_policy, &self.cancel, &mut check).await
    }

    async fn await_collections(
        &self,
        correlation_id: &str,
        collections: &[String],
    ) -> bool {
        // Shared by every collection wait so the first failure stops the rest.
        let scope = self.cancel.child_token();
        let waits = collections.iter().map(|collection| {
            let scope = &scope;
            async move {
                let mut check = CollectionCheck {
                    store: self.store.as_ref(),
                    table: &self.collection_table,
                    key: ItemKey::collection(correlation_id, collection.as_str()),
                };
                let outcome =
                    poll_until(self.collection_policy, scope, &mut check).await;
                let succeeded = matches!(outcome, PollOutcome::Satisfied(true));
                if !succeeded {
                    match outcome {
                        PollOutcome::Satisfied(_) => warn!(
                            target: "stage::dependency",
                            collection = %collection,
                            "collection reported failure"
                        ),
                        PollOutcome::TimedOut => warn!(
                            target: "stage::dependency",
                            collection = %collection,
                            timeout_ms =
                                self.collection_policy.timeout.as_millis() as u64,
                            "collection did not complete before its deadline"
                        ),
                        PollOutcome::Cancelled => debug!(
                            target: "stage::dependency",
                            collection = %collection,
                            "collection wait cancelled"
                        ),
                    }
                    scope.cancel();
                }
                succeeded
            }
        });

        join_all(waits).await.into_iter().all(|succeeded| succeeded)
    }

    /// Second lookup after the wait, so the returned record reflects the
    /// store as it is now rather than when polling began.
    async fn resolve_again(
        &self,
        request: &DependencyRequest,
    ) -> Option<DependencyRecord> {
        let scan = self.scan_request(request);
        let item = match find_first(self.store.as_ref(), scan).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(
                    target: "stage::dependency",
                    product = %request.data_product,
                    "dependency record disappeared after the wait"
                );
                return None;
            }
            Err(err) => {
                warn!(
                    target: "stage::dependency",
                    error = %err,
                    "failed to re-resolve dependency record"
                );
                return None;
            }
        };

        match decode_dependency(&item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    target: "stage::dependency",
                    error = %err,
                    "dependency record is malformed"
                );
                None
            }
        }
    }

    fn log_unsatisfied<T>(
        &self,
        request: &DependencyRequest,
        outcome: &PollOutcome<T>,
    ) {
        match outcome {
            PollOutcome::TimedOut => warn!(
                target: "stage::dependency",
                product = %request.data_product,
                export_date = %request.export_date,
                "timed out waiting for dependency"
            ),
            PollOutcome::Cancelled => info!(
                target: "stage::dependency",
                product = %request.data_product,
                "dependency wait cancelled"
            ),
            PollOutcome::Satisfied(_) => {}
        }
    }
}

impl Cancellable for DependencyWaitEngine {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
impl DependencyWaiter for DependencyWaitEngine {
    #[instrument(
        level = "info",
        skip(self, request),
        fields(product = %request.data_product, export_date = %request.export_date)
    )]
    async fn await_dependency(
        &self,
        request: &DependencyRequest,
    ) -> Result<Option<DependencyRecord>> {
        if self.cancel.is_cancelled() {
            info!(
                target: "stage::dependency",
                "cancelled before waiting on dependency"
            );
            return Ok(None);
        }

        if request.collections.is_empty() {
            let outcome = self.await_record(request, LookupGoal::Terminal).await;
            let record = match outcome {
                PollOutcome::Satisfied(record) => record,
                unsatisfied => {
                    self.log_unsatisfied(request, &unsatisfied);
                    return Ok(None);
                }
            };
            if !record.status.is_success() {
                warn!(
                    target: "stage::dependency",
                    correlation_id = %record.correlation_id,
                    status = %record.status,
                    "dependency finished without success"
                );
                return Ok(None);
            }
        } else {
            let outcome = self.await_record(request, LookupGoal::Present).await;
            let record = match outcome {
                PollOutcome::Satisfied(record) => record,
                unsatisfied => {
                    self.log_unsatisfied(request, &unsatisfied);
                    return Ok(None);
                }
            };
            info!(
                target: "stage::dependency",
                correlation_id = %record.correlation_id,
                collections = request.collections.len(),
                "waiting on collections"
            );
            if !self
                .await_collections(&record.correlation_id, &request.collections)
                .await
            {
                return Ok(None);
            }
        }

        let Some(record) = self.resolve_again(request).await else {
            return Ok(None);
        };
        if request.collections.is_empty() && !record.status.is_success() {
            warn!(
                target: "stage::dependency",
                status = %record.status,
                "dependency status changed after completion"
            );
            return Ok(None);
        }

        info!(
            target: "stage::dependency",
            correlation_id = %record.correlation_id,
            "dependency satisfied"
        );
        Ok(Some(record))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupGoal {
    Present,
    Terminal,
}

/// Finds the dependency record by scan, then follows it by point lookup.
struct RecordCheck<'a> {
    store: &'a dyn StatusStore,
    status_table: &'a str,
    scan: ScanRequest,
    key: Option<ItemKey>,
    goal: LookupGoal,
}

impl RecordCheck<'_> {
    async fn lookup(&mut self) -> Result<Option<DependencyRecord>> {
        let item = match &self.key {
            Some(key) => self.store.get_item(self.status_table, key).await?,
            None => find_first(self.store, self.scan.clone()).await?,
        };
        let Some(item) = item else {
            return Ok(None);
        };
        let record = decode_dependency(&item)?;
        if self.key.is_none() {
            self.key = Some(ItemKey::status(
                &record.correlation_id,
                &record.data_product,
            ));
        }
        Ok(Some(record))
    }
}

#[async_trait]
impl PollCheck for RecordCheck<'_> {
    type Output = DependencyRecord;

    async fn check(&mut self) -> Tick<DependencyRecord> {
        match self.lookup().await {
            Ok(Some(record)) => {
                let ready = match self.goal {
                    LookupGoal::Present => true,
                    LookupGoal::Terminal => record.status.is_terminal(),
                };
                if ready {
                    Tick::Ready(record)
                } else {
                    debug!(
                        target: "stage::dependency",
                        status = %record.status,
                        "dependency still pending"
                    );
                    Tick::Pending
                }
            }
            Ok(None) => {
                debug!(
                    target: "stage::dependency",
                    "dependency record not present yet"
                );
                Tick::Pending
            }
            Err(err) => {
                warn!(
                    target: "stage::dependency",
                    error = %err,
                    "dependency lookup failed"
                );
                Tick::Pending
            }
        }
    }
}

/// Follows a single per-collection status row. Ready with `true` on success
/// and `false` on an explicit failure.
struct CollectionCheck<'a> {
    store: &'a dyn StatusStore,
    table: &'a str,
    key: ItemKey,
}

#[async_trait]
impl PollCheck for CollectionCheck<'_> {
    type Output = bool;

    async fn check(&mut self) -> Tick<bool> {
        let item = match self.store.get_item(self.table, &self.key).await {
            Ok(Some(item)) => item,
            Ok(None) => return Tick::Pending,
            Err(err) => {
                warn!(
                    target: "stage::dependency",
                    collection = %self.key.range_value,
                    error = %err,
                    "collection status lookup failed"
                );
                return Tick::Pending;
            }
        };

        let status = string_field(&item, fields::collection::STATUS)
            .map(CollectionStatus::parse);
        match status {
            Some(CollectionStatus::Completed) => Tick::Ready(true),
            Some(CollectionStatus::Failed) => Tick::Ready(false),
            Some(CollectionStatus::Pending(_)) | None => Tick::Pending,
        }
    }
}
