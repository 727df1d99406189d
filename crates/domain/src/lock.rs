use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ExecutionReference;

/// Fixed key of the singleton lock record.
pub const LOCK_RECORD_ID: &str = "0";

/// Result of one conditional acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireOutcome {
    /// The record was free and now names the new execution reference.
    Acquired,
    /// Another run already holds the record; nothing was written.
    AlreadyActive,
}

impl AcquireOutcome {
    /// Returns stable outcome value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquired => "acquired",
            Self::AlreadyActive => "already_active",
        }
    }
}

/// Singleton record tracking whether the workload is active.
///
/// `execution_reference` is present iff `in_progress` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    in_progress: bool,
    execution_reference: Option<ExecutionReference>,
    updated_at: DateTime<Utc>,
}

impl LockRecord {
    /// Creates a held record naming the active run.
    #[must_use]
    pub fn acquired(execution_reference: ExecutionReference, updated_at: DateTime<Utc>) -> Self {
        Self {
            in_progress: true,
            execution_reference: Some(execution_reference),
            updated_at,
        }
    }

    /// Creates a released record.
    #[must_use]
    pub fn released(updated_at: DateTime<Utc>) -> Self {
        Self {
            in_progress: false,
            execution_reference: None,
            updated_at,
        }
    }

    /// Rebuilds a record from persisted columns.
    ///
    /// A stored reference on a released record is dropped. A held record
    /// without a reference is kept as-is so stop requests can report it.
    #[must_use]
    pub fn from_parts(
        in_progress: bool,
        execution_reference: Option<ExecutionReference>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            in_progress,
            execution_reference: if in_progress {
                execution_reference
            } else {
                None
            },
            updated_at,
        }
    }

    /// Returns true when the conditional acquire gate is open for `current`.
    #[must_use]
    pub fn can_acquire(current: Option<&Self>) -> bool {
        current.is_none_or(|record| !record.in_progress)
    }

    /// Returns the stable record key.
    #[must_use]
    pub fn id(&self) -> &'static str {
        LOCK_RECORD_ID
    }

    /// Returns whether a run is active or presumed active.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Returns the active run reference.
    #[must_use]
    pub fn execution_reference(&self) -> Option<&ExecutionReference> {
        self.execution_reference.as_ref()
    }

    /// Returns true when the record is held by the given run.
    #[must_use]
    pub fn is_held_by(&self, execution_reference: &ExecutionReference) -> bool {
        self.in_progress && self.execution_reference.as_ref() == Some(execution_reference)
    }

    /// Returns last write timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
