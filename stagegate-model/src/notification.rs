use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NotificationType {
    Information,
    Warning,
    Error,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Message published to the monitoring topic on stage lifecycle changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NotificationMessage {
    pub severity: Severity,
    pub notification_type: NotificationType,
    pub slack_username: String,
    pub title_text: String,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn message_uses_wire_field_names() {
        let message = NotificationMessage {
            severity: Severity::Critical,
            notification_type: NotificationType::Error,
            slack_username: "Pipeline".into(),
            title_text: "stage failed".into(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["severity"], "Critical");
        assert_eq!(value["notification_type"], "Error");
        assert_eq!(value["slack_username"], "Pipeline");
        assert_eq!(value["title_text"], "stage failed");
    }
}
