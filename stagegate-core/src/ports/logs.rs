use async_trait::async_trait;
use stagegate_model::LogEvent;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStreamPage {
    pub stream_names: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEventsPage {
    pub events: Vec<LogEvent>,
    /// Token for the next forward read. Equal to the token that was passed in
    /// once the stream has been drained.
    pub next_forward_token: Option<String>,
}

/// Remote log store holding the output of cluster steps.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn describe_log_streams(
        &self,
        group: &str,
        prefix: &str,
        next_token: Option<&str>,
    ) -> Result<LogStreamPage>;

    /// Reads forward from the head of the stream, or from `forward_token`.
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        forward_token: Option<&str>,
    ) -> Result<LogEventsPage>;
}

/// Destination for step output read from the log store.
pub trait StepLogSink: Send + Sync {
    fn emit(&self, step_id: &str, event: &LogEvent);
}
