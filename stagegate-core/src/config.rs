use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poll::PollPolicy;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Upper bound on `status-ttl-days`.
pub const MAX_STATUS_TTL_DAYS: i64 = 3_650;

/// Knobs that tune how a stage waits, launches, and supervises its cluster.
///
/// All fields carry defaults so hosts only need to supply the values they
/// want to change. Keys use the kebab-case option names understood by the
/// job host (`dependency-poll-interval-ms`, `log-group-name`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StageConfig {
    /// Cadence of dependency status checks.
    pub dependency_poll_interval_ms: u64,
    /// Deadline for a product-level dependency to reach a terminal status.
    pub dependency_poll_timeout_ms: u64,
    /// Deadline for each named sub-collection to reach success.
    pub collection_poll_timeout_ms: u64,
    /// Cadence of cluster state checks while the cluster boots.
    pub cluster_startup_poll_interval_ms: u64,
    /// Deadline for the cluster to reach `RUNNING` or a terminal state.
    pub cluster_startup_timeout_ms: u64,
    /// Cadence of step list checks once the cluster is running.
    pub step_poll_interval_ms: u64,
    /// Deadline for every step to leave the active set. Also bounds log tailing.
    pub step_timeout_ms: u64,
    /// How long the step phase waits for a first step to appear before
    /// treating the cluster as having no work.
    pub step_discovery_grace_ms: u64,
    /// Cadence of log fetches while a step is being tailed.
    pub log_poll_interval_ms: u64,
    /// Log group carrying step output. Empty disables log tailing.
    pub log_group_name: String,
    /// Table holding per-product stage status rows.
    pub status_table_name: String,
    /// Table holding per-collection export status rows.
    pub collection_status_table_name: String,
    /// Prefix applied to this stage's own product name in the status table.
    pub product_namespace: String,
    /// Lifetime of this stage's own status row before the store expires it.
    pub status_ttl_days: i64,
    /// Name of the external function that provisions the cluster.
    pub launcher_function_name: String,
    /// Topic receiving lifecycle notifications. Empty disables publishing.
    pub notification_topic_name: String,
    /// Display name attached to published notifications.
    pub notification_username: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            dependency_poll_interval_ms: 10_000,
            dependency_poll_timeout_ms: 60 * 60 * 1_000,
            collection_poll_timeout_ms: 5 * 60 * 60 * 1_000,
            cluster_startup_poll_interval_ms: 10_000,
            cluster_startup_timeout_ms: 2 * 60 * 60 * 1_000,
            step_poll_interval_ms: 5_000,
            step_timeout_ms: 24 * 60 * 60 * 1_000,
            step_discovery_grace_ms: 5 * 60 * 1_000,
            log_poll_interval_ms: 5_000,
            log_group_name: String::new(),
            status_table_name: "data_pipeline_metadata".to_string(),
            collection_status_table_name: "collection_status".to_string(),
            product_namespace: "PIPELINE".to_string(),
            status_ttl_days: 30,
            launcher_function_name: "cluster_launcher".to_string(),
            notification_topic_name: String::new(),
            notification_username: "Pipeline Job Notification".to_string(),
        }
    }
}

impl StageConfig {
    pub fn product_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(
            self.dependency_poll_interval_ms,
            self.dependency_poll_timeout_ms,
        )
    }

    pub fn collection_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(
            self.dependency_poll_interval_ms,
            self.collection_poll_timeout_ms,
        )
    }

    pub fn startup_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(
            self.cluster_startup_poll_interval_ms,
            self.cluster_startup_timeout_ms,
        )
    }

    pub fn step_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(self.step_poll_interval_ms, self.step_timeout_ms)
    }

    pub fn log_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(self.log_poll_interval_ms, self.step_timeout_ms)
    }

    pub fn step_discovery_grace(&self) -> Duration {
        Duration::from_millis(self.step_discovery_grace_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        let days = u64::try_from(self.status_ttl_days).unwrap_or(0);
        Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn log_group(&self) -> Option<&str> {
        non_blank(&self.log_group_name)
    }

    pub fn notification_topic(&self) -> Option<&str> {
        non_blank(&self.notification_topic_name)
    }

    /// Rejects settings that would make a wait spin or never tick.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let waits = [
            (
                "dependency-poll-interval-ms",
                self.dependency_poll_interval_ms,
                "dependency-poll-timeout-ms",
                self.dependency_poll_timeout_ms,
            ),
            (
                "dependency-poll-interval-ms",
                self.dependency_poll_interval_ms,
                "collection-poll-timeout-ms",
                self.collection_poll_timeout_ms,
            ),
            (
                "cluster-startup-poll-interval-ms",
                self.cluster_startup_poll_interval_ms,
                "cluster-startup-timeout-ms",
                self.cluster_startup_timeout_ms,
            ),
            (
                "step-poll-interval-ms",
                self.step_poll_interval_ms,
                "step-timeout-ms",
                self.step_timeout_ms,
            ),
            (
                "log-poll-interval-ms",
                self.log_poll_interval_ms,
                "step-timeout-ms",
                self.step_timeout_ms,
            ),
        ];

        for (interval_key, interval, timeout_key, timeout) in waits {
            if interval == 0 {
                return Err(ConfigValidationError::ZeroInterval(interval_key));
            }
            if timeout < interval {
                return Err(ConfigValidationError::TimeoutShorterThanInterval {
                    timeout: timeout_key,
                    interval: interval_key,
                });
            }
        }

        if self.status_ttl_days <= 0 {
            return Err(ConfigValidationError::NonPositiveTtl(self.status_ttl_days));
        }
        if self.status_ttl_days > MAX_STATUS_TTL_DAYS {
            return Err(ConfigValidationError::TtlTooLong(self.status_ttl_days));
        }
        if self.product_namespace.trim().is_empty() {
            return Err(ConfigValidationError::Blank("product-namespace"));
        }
        if self.launcher_function_name.trim().is_empty() {
            return Err(ConfigValidationError::Blank("launcher-function-name"));
        }

        Ok(())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("{timeout} must not be shorter than {interval}")]
    TimeoutShorterThanInterval {
        timeout: &'static str,
        interval: &'static str,
    },

    #[error("status-ttl-days must be positive, got {0}")]
    NonPositiveTtl(i64),

    #[error(
        "status-ttl-days must be at most {max}, got {0}",
        max = MAX_STATUS_TTL_DAYS
    )]
    TtlTooLong(i64),

    #[error("{0} must not be blank")]
    Blank(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_options() {
        let config = StageConfig::default();
        assert_eq!(config.dependency_poll_interval_ms, 10_000);
        assert_eq!(config.dependency_poll_timeout_ms, 3_600_000);
        assert_eq!(config.collection_poll_timeout_ms, 18_000_000);
        assert_eq!(config.cluster_startup_poll_interval_ms, 10_000);
        assert_eq!(config.step_poll_interval_ms, 5_000);
        assert_eq!(config.step_discovery_grace(), Duration::from_secs(300));
        assert_eq!(config.log_group(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn kebab_case_keys_deserialize_with_defaults() {
        let config: StageConfig = serde_json::from_str(
            r#"{"dependency-poll-interval-ms": 500, "log-group-name": " /cluster/steps "}"#,
        )
        .unwrap();
        assert_eq!(config.dependency_poll_interval_ms, 500);
        assert_eq!(config.log_group(), Some("/cluster/steps"));
        assert_eq!(config.step_poll_interval_ms, 5_000);
    }

    #[test]
    fn validation_rejects_degenerate_waits() {
        let config = StageConfig {
            step_poll_interval_ms: 0,
            ..StageConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroInterval("step-poll-interval-ms"))
        );

        let config = StageConfig {
            cluster_startup_timeout_ms: 5,
            ..StageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::TimeoutShorterThanInterval {
                timeout: "cluster-startup-timeout-ms",
                ..
            })
        ));
    }

    #[test]
    fn oversized_ttl_is_rejected_and_never_overflows() {
        let config = StageConfig {
            status_ttl_days: 200_000_000_000_000,
            ..StageConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::TtlTooLong(200_000_000_000_000))
        );
        assert_eq!(
            config.status_ttl(),
            Duration::from_secs(200_000_000_000_000 * SECONDS_PER_DAY)
        );

        let config = StageConfig {
            status_ttl_days: i64::MAX,
            ..StageConfig::default()
        };
        assert_eq!(config.status_ttl(), Duration::from_secs(u64::MAX));
    }
}
