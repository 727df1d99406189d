use async_trait::async_trait;
use ondemand_core::AppResult;
use ondemand_domain::ExecutionReference;

/// Submission side of the durable workflow engine.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Submits a new run and returns its reference.
    async fn start_run(&self) -> AppResult<ExecutionReference>;

    /// Requests termination of one run. Finished runs are a no-op.
    async fn stop_run(&self, execution_reference: &ExecutionReference) -> AppResult<()>;
}
