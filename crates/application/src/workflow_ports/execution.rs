use chrono::{DateTime, Utc};
use ondemand_domain::{ExecutionReference, TaskHandle, WorkflowRunState, WorkflowStep};

/// Persisted workflow run record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    /// Stable run reference.
    pub execution_reference: ExecutionReference,
    /// Current lifecycle state.
    pub state: WorkflowRunState,
    /// Last step the engine entered.
    pub current_step: Option<WorkflowStep>,
    /// Launched workload task, once known.
    pub task: Option<TaskHandle>,
    /// Step failure or reconciliation detail.
    pub failure_reason: Option<String>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Run leased to one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedWorkflowRun {
    /// Stable run reference.
    pub execution_reference: ExecutionReference,
    /// Fencing token for every write made under this lease.
    pub lease_token: String,
    /// Task launched by a previous lease holder, when recovering.
    pub task: Option<TaskHandle>,
    /// Whether a stop was requested before the claim.
    pub stop_requested: bool,
    /// First time any worker started executing the run.
    pub started_at: DateTime<Utc>,
}

/// Run completion payload for repository implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteWorkflowRunInput {
    /// Run reference.
    pub execution_reference: ExecutionReference,
    /// Lease token held by the completing worker.
    pub lease_token: String,
    /// Terminal state.
    pub state: WorkflowRunState,
    /// Optional failure detail.
    pub failure_reason: Option<String>,
}
