//! Fakes for the launcher and notification ports.

use std::sync::Mutex;

use async_trait::async_trait;
use stagegate_core::ports::{LaunchInvoker, TopicPage, TopicPublisher};
use stagegate_core::{Result, StageError};

/// Answers every invocation with the same body.
pub struct StaticInvoker {
    response: Option<String>,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl StaticInvoker {
    pub fn responding(cluster_id: Option<&str>, http_status: u16) -> Self {
        let body = serde_json::json!({
            "JobFlowId": cluster_id,
            "ClusterArn": cluster_id.map(|id| format!("arn:cluster/{id}")),
            "ResponseMetadata": {
                "RequestId": "req-1",
                "HTTPStatusCode": http_status,
                "RetryAttempts": 0
            }
        });
        Self {
            response: Some(body.to_string()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            response: None,
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LaunchInvoker for StaticInvoker {
    async fn invoke(&self, _function_name: &str, payload: Vec<u8>) -> Result<Vec<u8>> {
        self.payloads
            .lock()
            .unwrap()
            .push(serde_json::from_slice(&payload)?);
        match &self.response {
            Some(body) => Ok(body.clone().into_bytes()),
            None => Err(StageError::Launch("connection refused".into())),
        }
    }
}

/// Single-topic publisher recording message titles.
#[derive(Default)]
pub struct RecordingTopics {
    titles: Mutex<Vec<String>>,
}

impl RecordingTopics {
    pub const ARN: &'static str = "arn:topic:pipeline-monitoring";

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicPublisher for RecordingTopics {
    async fn list_topics(&self, _next_token: Option<&str>) -> Result<TopicPage> {
        Ok(TopicPage {
            topic_arns: vec![Self::ARN.to_string()],
            next_token: None,
        })
    }

    async fn publish(&self, _topic_arn: &str, message: &str) -> Result<String> {
        let body: serde_json::Value = serde_json::from_str(message)?;
        let mut titles = self.titles.lock().unwrap();
        titles.push(body["title_text"].as_str().unwrap_or_default().to_string());
        Ok(format!("msg-{}", titles.len()))
    }
}
