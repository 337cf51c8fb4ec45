use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownClusterState(String),
    UnknownStepState(String),
    MissingField(&'static str),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownClusterState(raw) => {
                write!(f, "unknown cluster state: {raw}")
            }
            ModelError::UnknownStepState(raw) => {
                write!(f, "unknown step state: {raw}")
            }
            ModelError::MissingField(field) => {
                write!(f, "missing required field: {field}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
