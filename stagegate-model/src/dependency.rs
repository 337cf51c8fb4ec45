use std::fmt;

use crate::fields;

/// Lifecycle status of a pipeline stage as stored in the status table.
///
/// Only `Completed` and `Failed` are terminal; every other value, including
/// free-form strings written by older producers, counts as pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum DependencyStatus {
    Starting,
    Started,
    Completed,
    Failed,
    Other(String),
}

impl DependencyStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            fields::STATUS_STARTING => Self::Starting,
            fields::STATUS_STARTED => Self::Started,
            fields::STATUS_COMPLETED => Self::Completed,
            fields::STATUS_FAILED => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => fields::STATUS_STARTING,
            Self::Started => fields::STATUS_STARTED,
            Self::Completed => fields::STATUS_COMPLETED,
            Self::Failed => fields::STATUS_FAILED,
            Self::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<String> for DependencyStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DependencyStatus> for String {
    fn from(status: DependencyStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the shared status table, identified by
/// `(correlation_id, data_product)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DependencyRecord {
    pub correlation_id: String,
    pub data_product: String,
    pub export_date: String,
    pub status: DependencyStatus,
    pub cluster_id: Option<String>,
    pub snapshot_type: Option<String>,
    /// `S3_Prefix_Analytical_DataSet`
    pub dataset_prefix: Option<String>,
    /// `S3_Prefix_Snapshots`
    pub snapshots_prefix: Option<String>,
    /// Expiry as epoch seconds.
    pub time_to_live: Option<i64>,
}

impl DependencyRecord {
    pub fn new(
        correlation_id: impl Into<String>,
        data_product: impl Into<String>,
        export_date: impl Into<String>,
        status: DependencyStatus,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            data_product: data_product.into(),
            export_date: export_date.into(),
            status,
            cluster_id: None,
            snapshot_type: None,
            dataset_prefix: None,
            snapshots_prefix: None,
            time_to_live: None,
        }
    }

    /// Prefix carried forward to the launcher: the analytical dataset prefix
    /// when present, otherwise the snapshots prefix.
    pub fn effective_prefix(&self) -> Option<&str> {
        let non_empty = |prefix: &&str| !prefix.is_empty();
        self.dataset_prefix
            .as_deref()
            .filter(non_empty)
            .or(self.snapshots_prefix.as_deref().filter(non_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(DependencyStatus::parse("Completed").is_terminal());
        assert!(DependencyStatus::parse("Failed").is_terminal());
        assert!(!DependencyStatus::parse("Starting").is_terminal());
        assert!(!DependencyStatus::parse("In_Progress").is_terminal());
        assert_eq!(
            DependencyStatus::parse("In_Progress"),
            DependencyStatus::Other("In_Progress".into())
        );
    }

    #[test]
    fn status_names_are_case_sensitive() {
        assert!(!DependencyStatus::parse("completed").is_success());
        assert!(DependencyStatus::parse("Completed").is_success());
    }

    #[test]
    fn effective_prefix_prefers_analytical_dataset() {
        let mut record = DependencyRecord::new(
            "corr-1",
            "ADG-full",
            "2024-01-01",
            DependencyStatus::Completed,
        );
        assert_eq!(record.effective_prefix(), None);

        record.snapshots_prefix = Some("snapshots/".into());
        assert_eq!(record.effective_prefix(), Some("snapshots/"));

        record.dataset_prefix = Some("analytical/".into());
        assert_eq!(record.effective_prefix(), Some("analytical/"));
    }
}
