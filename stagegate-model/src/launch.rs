use crate::dependency::DependencyRecord;

/// Placeholder written for payload fields with no known value, so the
/// launcher always receives every field.
pub const NOT_SET: &str = "NOT_SET";

fn sentinel_or(value: Option<&str>) -> String {
    value
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or(NOT_SET)
        .to_string()
}

#[cfg(feature = "serde")]
fn deserialize_sentinel<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(sentinel_or(raw.as_deref()))
}

#[cfg(feature = "serde")]
fn not_set() -> String {
    NOT_SET.to_string()
}

/// Request body sent to the external cluster launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaunchPayload {
    #[cfg_attr(
        feature = "serde",
        serde(default = "not_set", deserialize_with = "deserialize_sentinel")
    )]
    correlation_id: String,
    #[cfg_attr(
        feature = "serde",
        serde(default = "not_set", deserialize_with = "deserialize_sentinel")
    )]
    s3_prefix: String,
    #[cfg_attr(
        feature = "serde",
        serde(default = "not_set", deserialize_with = "deserialize_sentinel")
    )]
    snapshot_type: String,
    #[cfg_attr(
        feature = "serde",
        serde(default = "not_set", deserialize_with = "deserialize_sentinel")
    )]
    export_date: String,
}

impl LaunchPayload {
    pub fn new(
        correlation_id: Option<&str>,
        s3_prefix: Option<&str>,
        snapshot_type: Option<&str>,
        export_date: Option<&str>,
    ) -> Self {
        Self {
            correlation_id: sentinel_or(correlation_id),
            s3_prefix: sentinel_or(s3_prefix),
            snapshot_type: sentinel_or(snapshot_type),
            export_date: sentinel_or(export_date),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn s3_prefix(&self) -> &str {
        &self.s3_prefix
    }

    pub fn snapshot_type(&self) -> &str {
        &self.snapshot_type
    }

    pub fn export_date(&self) -> &str {
        &self.export_date
    }
}

impl From<&DependencyRecord> for LaunchPayload {
    fn from(record: &DependencyRecord) -> Self {
        Self::new(
            Some(&record.correlation_id),
            record.effective_prefix(),
            record.snapshot_type.as_deref(),
            Some(&record.export_date),
        )
    }
}

/// Transport metadata attached to every launcher response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponseMetadata {
    #[cfg_attr(feature = "serde", serde(rename = "RequestId", default))]
    pub request_id: String,
    #[cfg_attr(feature = "serde", serde(rename = "HTTPStatusCode"))]
    pub http_status_code: u16,
    #[cfg_attr(feature = "serde", serde(rename = "RetryAttempts", default))]
    pub retry_attempts: u32,
}

/// Structured result returned by the external cluster launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaunchResult {
    #[cfg_attr(feature = "serde", serde(rename = "JobFlowId", default))]
    pub cluster_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "ClusterArn", default))]
    pub cluster_arn: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "ResponseMetadata"))]
    pub metadata: ResponseMetadata,
}

impl LaunchResult {
    pub fn successful(&self) -> bool {
        self.metadata.http_status_code == 200
    }

    /// The cluster id, when present and non-blank.
    pub fn usable_cluster_id(&self) -> Option<&str> {
        self.cluster_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn request_id(&self) -> &str {
        &self.metadata.request_id
    }

    pub fn http_status_code(&self) -> u16 {
        self.metadata.http_status_code
    }

    pub fn retry_attempts(&self) -> u32 {
        self.metadata.retry_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyStatus;

    #[test]
    fn absent_fields_become_sentinel() {
        let payload = LaunchPayload::new(Some("corr"), None, Some("  "), None);
        assert_eq!(payload.correlation_id(), "corr");
        assert_eq!(payload.s3_prefix(), NOT_SET);
        assert_eq!(payload.snapshot_type(), NOT_SET);
        assert_eq!(payload.export_date(), NOT_SET);
    }

    #[test]
    fn payload_derives_from_record() {
        let mut record = DependencyRecord::new(
            "corr-7",
            "ADG-incremental",
            "2024-03-02",
            DependencyStatus::Completed,
        );
        record.snapshot_type = Some("incremental".into());
        record.snapshots_prefix = Some("data/snapshots".into());

        let payload = LaunchPayload::from(&record);
        assert_eq!(payload.correlation_id(), "corr-7");
        assert_eq!(payload.s3_prefix(), "data/snapshots");
        assert_eq!(payload.snapshot_type(), "incremental");
        assert_eq!(payload.export_date(), "2024-03-02");
    }

    #[test]
    fn only_http_200_is_successful() {
        let mut result = LaunchResult {
            cluster_id: Some("j-1".into()),
            cluster_arn: None,
            metadata: ResponseMetadata {
                request_id: "req".into(),
                http_status_code: 200,
                retry_attempts: 0,
            },
        };
        assert!(result.successful());
        result.metadata.http_status_code = 201;
        assert!(!result.successful());
    }

    #[test]
    fn blank_cluster_id_is_unusable() {
        let result = LaunchResult {
            cluster_id: Some("   ".into()),
            cluster_arn: None,
            metadata: ResponseMetadata::default(),
        };
        assert_eq!(result.usable_cluster_id(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialized_payload_keeps_sentinels() {
        let payload = LaunchPayload::new(Some("corr"), None, None, None);
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: LaunchPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.s3_prefix(), NOT_SET);
        assert_eq!(parsed.snapshot_type(), NOT_SET);
        assert_eq!(parsed.export_date(), NOT_SET);

        let sparse: LaunchPayload =
            serde_json::from_str(r#"{"correlation_id":"c","s3_prefix":null,"snapshot_type":""}"#)
                .unwrap();
        assert_eq!(sparse.s3_prefix(), NOT_SET);
        assert_eq!(sparse.snapshot_type(), NOT_SET);
        assert_eq!(sparse.export_date(), NOT_SET);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn launcher_response_parses_nested_metadata() {
        let raw = r#"{
            "JobFlowId": "j-123",
            "ClusterArn": "arn:cluster/j-123",
            "ResponseMetadata": {"RequestId": "abc", "HTTPStatusCode": 200, "RetryAttempts": 1}
        }"#;
        let result: LaunchResult = serde_json::from_str(raw).unwrap();
        assert!(result.successful());
        assert_eq!(result.usable_cluster_id(), Some("j-123"));
        assert_eq!(result.request_id(), "abc");
        assert_eq!(result.retry_attempts(), 1);
    }
}
