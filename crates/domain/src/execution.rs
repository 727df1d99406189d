use std::fmt::{Display, Formatter};

use ondemand_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Opaque handle to one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionReference(NonEmptyString);

impl ExecutionReference {
    /// Creates a validated execution reference.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ExecutionReference {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Lifecycle state of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunState {
    /// Submitted and waiting for a worker lease.
    Queued,
    /// Leased by a worker and executing.
    Running,
    /// Finished, including runs whose cleanup step completed.
    Succeeded,
    /// Cleanup itself failed; needs operator attention.
    Failed,
}

impl WorkflowRunState {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown workflow run state '{value}'"
            ))),
        }
    }

    /// Returns true once the run will not execute again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Step of the run-then-cleanup state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Launch and supervise the workload.
    RunWorkload,
    /// Release the lock after a failed workload step.
    Cleanup,
}

impl WorkflowStep {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunWorkload => "run_workload",
            Self::Cleanup => "cleanup",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "run_workload" => Ok(Self::RunWorkload),
            "cleanup" => Ok(Self::Cleanup),
            _ => Err(AppError::Validation(format!(
                "unknown workflow step '{value}'"
            ))),
        }
    }
}

/// Reason the RunWorkload step ended in error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadFailure {
    /// The compute platform rejected a launch, status or stop call.
    Platform(String),
    /// The workload exceeded the configured maximum run duration.
    TimedOut {
        /// Configured limit that was exceeded.
        after_seconds: u64,
    },
    /// A stop was requested for the run.
    Terminated,
    /// The workload stopped with a non-zero or missing exit code.
    Exited {
        /// Container exit code when reported.
        exit_code: Option<i32>,
        /// Platform stop reason when reported.
        reason: Option<String>,
    },
    /// The engine itself failed while driving the step.
    Internal(String),
}

impl Display for WorkloadFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform(message) => write!(formatter, "compute platform error: {message}"),
            Self::TimedOut { after_seconds } => {
                write!(formatter, "workload timed out after {after_seconds}s")
            }
            Self::Terminated => formatter.write_str("workload terminated by stop request"),
            Self::Exited { exit_code, reason } => {
                match exit_code {
                    Some(code) => write!(formatter, "workload exited with code {code}")?,
                    None => formatter.write_str("workload exited without an exit code")?,
                }
                if let Some(reason) = reason {
                    write!(formatter, " ({reason})")?;
                }
                Ok(())
            }
            Self::Internal(message) => write!(formatter, "workflow engine error: {message}"),
        }
    }
}
