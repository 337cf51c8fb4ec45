//! Field names and sentinels of the shared status store.
//!
//! These names are part of the on-disk contract with other pipeline stages and
//! must not change.

pub const CORRELATION_ID: &str = "Correlation_Id";
pub const DATA_PRODUCT: &str = "DataProduct";
pub const DATE: &str = "Date";
pub const STATUS: &str = "Status";
pub const CLUSTER_ID: &str = "Cluster_Id";
pub const S3_PREFIX_ANALYTICAL_DATASET: &str = "S3_Prefix_Analytical_DataSet";
pub const S3_PREFIX_SNAPSHOTS: &str = "S3_Prefix_Snapshots";
pub const SNAPSHOT_TYPE: &str = "Snapshot_Type";
pub const TIME_TO_EXIST: &str = "TimeToExist";

/// Per-collection status table.
pub mod collection {
    pub const CORRELATION_ID: &str = "CorrelationId";
    pub const COLLECTION_NAME: &str = "CollectionName";
    pub const STATUS: &str = "ADGStatus";
}

pub const STATUS_STARTING: &str = "Starting";
pub const STATUS_STARTED: &str = "Started";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_FAILED: &str = "Failed";
