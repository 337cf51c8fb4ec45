use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use stagegate_model::{NotificationMessage, NotificationType, Severity};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::StageConfig;
use crate::error::Result;
use crate::ports::TopicPublisher;

const DEFAULT_STAGE_LABEL: &str = "Pipeline job";

/// Lifecycle notifications. Failures are logged, never surfaced.
#[async_trait]
pub trait StageNotifier: Send + Sync {
    async fn notify_started(&self);

    async fn notify_succeeded(&self);

    async fn notify_failed(&self);
}

/// Publishes lifecycle messages to the topic whose ARN ends with the
/// configured name. Without such a topic, publishing is skipped.
pub struct NotificationEmitter {
    publisher: Arc<dyn TopicPublisher>,
    topic_name: Option<String>,
    username: String,
    stage_label: String,
    topic_arn: OnceCell<Option<String>>,
}

impl fmt::Debug for NotificationEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEmitter")
            .field("topic_name", &self.topic_name)
            .field("username", &self.username)
            .field("stage_label", &self.stage_label)
            .field("topic_arn", &self.topic_arn.get())
            .finish()
    }
}

impl NotificationEmitter {
    pub fn new(
        config: &StageConfig,
        stage_name: Option<&str>,
        publisher: Arc<dyn TopicPublisher>,
    ) -> Self {
        let stage_label = stage_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_STAGE_LABEL)
            .to_string();
        Self {
            publisher,
            topic_name: config.notification_topic().map(str::to_string),
            username: config.notification_username.clone(),
            stage_label,
            topic_arn: OnceCell::new(),
        }
    }

    /// Looks the topic up once; later calls reuse the answer. A failed
    /// lookup is not cached and is retried on the next notification.
    async fn topic_arn(&self) -> Result<Option<&str>> {
        let Some(name) = self.topic_name.as_deref() else {
            return Ok(None);
        };
        let arn = self
            .topic_arn
            .get_or_try_init(|| find_topic(self.publisher.as_ref(), name))
            .await?;
        Ok(arn.as_deref())
    }

    fn message(
        &self,
        severity: Severity,
        kind: NotificationType,
        event: &str,
    ) -> NotificationMessage {
        NotificationMessage {
            severity,
            notification_type: kind,
            slack_username: self.username.clone(),
            title_text: format!("{} {event}", self.stage_label),
        }
    }

    async fn publish(&self, message: NotificationMessage) {
        let arn = match self.topic_arn().await {
            Ok(Some(arn)) => arn,
            Ok(None) => {
                debug!(
                    target: "stage::notify",
                    title = %message.title_text,
                    "no notification topic, skipping"
                );
                return;
            }
            Err(err) => {
                warn!(
                    target: "stage::notify",
                    error = %err,
                    "failed to resolve notification topic"
                );
                return;
            }
        };

        let result = match serde_json::to_string(&message) {
            Ok(body) => self.publisher.publish(arn, &body).await,
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(message_id) => info!(
                target: "stage::notify",
                %message_id,
                title = %message.title_text,
                "notification published"
            ),
            Err(err) => warn!(
                target: "stage::notify",
                error = %err,
                title = %message.title_text,
                "failed to publish notification"
            ),
        }
    }
}

async fn find_topic(
    publisher: &dyn TopicPublisher,
    name: &str,
) -> Result<Option<String>> {
    let mut token: Option<String> = None;
    loop {
        let page = publisher.list_topics(token.as_deref()).await?;
        let found = page.topic_arns.into_iter().find(|arn| arn.ends_with(name));
        if let Some(arn) = found {
            return Ok(Some(arn));
        }
        match page.next_token {
            Some(next) => token = Some(next),
            None => {
                warn!(
                    target: "stage::notify",
                    topic = name,
                    "notification topic not found"
                );
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl StageNotifier for NotificationEmitter {
    async fn notify_started(&self) {
        let message =
            self.message(Severity::High, NotificationType::Information, "started");
        self.publish(message).await;
    }

    async fn notify_succeeded(&self) {
        let message = self.message(
            Severity::High,
            NotificationType::Information,
            "succeeded",
        );
        self.publish(message).await;
    }

    async fn notify_failed(&self) {
        let message =
            self.message(Severity::Critical, NotificationType::Error, "failed");
        self.publish(message).await;
    }
}
