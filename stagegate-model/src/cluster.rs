use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Lifecycle state of a compute cluster.
///
/// The `active`/`completed` predicate table is preserved verbatim from the
/// producing service. `Waiting` and `Terminating` are flagged as both active
/// and completed, which is most likely an upstream modelling bug; callers must
/// not infer a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ClusterState {
    Bootstrapping,
    Starting,
    Running,
    Waiting,
    Terminating,
    Terminated,
    TerminatedWithErrors,
}

impl ClusterState {
    pub const ALL: [ClusterState; 7] = [
        ClusterState::Bootstrapping,
        ClusterState::Starting,
        ClusterState::Running,
        ClusterState::Waiting,
        ClusterState::Terminating,
        ClusterState::Terminated,
        ClusterState::TerminatedWithErrors,
    ];

    pub fn is_active(self) -> bool {
        match self {
            Self::Bootstrapping
            | Self::Starting
            | Self::Running
            | Self::Waiting
            | Self::Terminating => true,
            Self::Terminated | Self::TerminatedWithErrors => false,
        }
    }

    pub fn is_completed(self) -> bool {
        match self {
            Self::Waiting
            | Self::Terminating
            | Self::Terminated
            | Self::TerminatedWithErrors => true,
            Self::Bootstrapping | Self::Starting | Self::Running => false,
        }
    }

    /// Only a running cluster accepts and executes steps.
    pub fn accepts_steps(self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn api_name(self) -> &'static str {
        match self {
            Self::Bootstrapping => "BOOTSTRAPPING",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::TerminatedWithErrors => "TERMINATED_WITH_ERRORS",
        }
    }
}

impl FromStr for ClusterState {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.api_name().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| ModelError::UnknownClusterState(raw.to_string()))
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Lifecycle state of a single step submitted to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StepState {
    Pending,
    CancelPending,
    Running,
    Completed,
    Cancelled,
    Failed,
    Interrupted,
}

impl StepState {
    pub const ALL: [StepState; 7] = [
        StepState::Pending,
        StepState::CancelPending,
        StepState::Running,
        StepState::Completed,
        StepState::Cancelled,
        StepState::Failed,
        StepState::Interrupted,
    ];

    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::CancelPending | Self::Running)
    }

    pub fn api_name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::CancelPending => "CANCEL_PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

impl FromStr for StepState {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.api_name().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| ModelError::UnknownStepState(raw.to_string()))
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Snapshot of a cluster returned by the cluster service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterDescription {
    pub id: String,
    pub name: String,
    pub state: ClusterState,
}

/// Snapshot of a step returned by the cluster service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepSummary {
    pub id: String,
    pub name: String,
    pub state: StepState,
}

impl StepSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: StepState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state,
        }
    }
}
