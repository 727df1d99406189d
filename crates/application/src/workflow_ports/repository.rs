use async_trait::async_trait;
use ondemand_core::AppResult;
use ondemand_domain::{ExecutionReference, TaskHandle, WorkflowStep};

use super::execution::{ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowRun};

/// Execution side of the durable workflow engine.
#[async_trait]
pub trait WorkflowRunRepository: Send + Sync {
    /// Leases queued runs, or running runs whose lease expired.
    async fn claim_runs(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedWorkflowRun>>;

    /// Extends one lease and returns false when the token no longer owns the run.
    async fn renew_lease(&self, run: &ClaimedWorkflowRun, lease_seconds: u32) -> AppResult<bool>;

    /// Records the step the run is entering.
    async fn record_step(&self, run: &ClaimedWorkflowRun, step: WorkflowStep) -> AppResult<()>;

    /// Records the launched task so a recovering worker can resume supervision.
    async fn record_task(&self, run: &ClaimedWorkflowRun, task: &TaskHandle) -> AppResult<()>;

    /// Returns whether a stop was requested for the run.
    async fn is_stop_requested(&self, execution_reference: &ExecutionReference)
    -> AppResult<bool>;

    /// Moves one leased run to a terminal state.
    async fn complete_run(&self, input: CompleteWorkflowRunInput) -> AppResult<WorkflowRun>;
}
