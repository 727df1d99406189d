//! Shared primitives for all Rust crates in the on-demand server controller.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across controller crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Application error categories.
///
/// Lock conflicts are not represented here: a lost conditional acquire is an
/// expected outcome and is modeled as a value by the lock store port.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is not allowed to invoke the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stop was requested while no workflow run holds the lock.
    #[error("server is not running")]
    NotRunning,

    /// The lock store could not be reached or rejected the operation.
    #[error("lock store unavailable: {0}")]
    StoreUnavailable(String),

    /// The workflow engine did not accept a new run.
    #[error("workflow submission failed: {0}")]
    WorkflowSubmissionFailed(String),

    /// The workflow engine did not accept a termination request.
    #[error("workflow termination failed: {0}")]
    WorkflowTerminationFailed(String),

    /// The compute or network platform could not resolve a workload address.
    #[error("platform resolution failed: {0}")]
    PlatformResolutionFailed(String),

    /// The naming service rejected a record update.
    #[error("naming update failed: {0}")]
    NamingUpdateFailed(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
