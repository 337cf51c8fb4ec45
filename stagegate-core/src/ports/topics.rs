use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPage {
    pub topic_arns: Vec<String>,
    pub next_token: Option<String>,
}

/// Pub/sub service receiving stage lifecycle notifications.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn list_topics(&self, next_token: Option<&str>) -> Result<TopicPage>;

    /// Publishes a JSON message and returns the message id.
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<String>;
}
