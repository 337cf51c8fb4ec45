use stagegate_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Status store error: {0}")]
    Store(String),

    #[error("Conditional write rejected: {0}")]
    ConditionFailed(String),

    #[error("Launcher error: {0}")]
    Launch(String),

    #[error("Cluster service error: {0}")]
    Cluster(String),

    #[error("Log store error: {0}")]
    Logs(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ModelError),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StageError>;
