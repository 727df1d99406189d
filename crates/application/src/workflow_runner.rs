use std::sync::Arc;
use std::time::Duration;

use ondemand_core::{AppError, AppResult};
use ondemand_domain::{TaskHandle, WorkflowRunState, WorkflowStep, WorkloadFailure, WorkloadSpec};
use tracing::{error, info, warn};

use crate::cleanup_handler::{CleanupHandler, CleanupOutcome};
use crate::lifecycle_ports::LockStore;
use crate::platform_ports::ComputePlatform;
use crate::workflow_ports::{
    ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowRun, WorkflowRunRepository,
};

mod ownership;
mod supervision;

/// Runtime settings for workflow execution.
#[derive(Debug, Clone)]
pub struct WorkflowRunnerConfig {
    /// Workload launched by every run.
    pub workload: WorkloadSpec,
    /// Delay between supervision polls.
    pub poll_interval: Duration,
    /// Lease duration requested on claim and renewal.
    pub lease_seconds: u32,
    /// Optional upper bound on one run, measured from its first claim.
    pub max_run_duration: Option<Duration>,
    /// How long a fresh run waits for the lock to name it before launching.
    pub ownership_grace: Duration,
}

/// Why the RunWorkload step stopped early.
#[derive(Debug)]
enum StepError {
    /// The step failed; the run moves to Cleanup.
    Failed(WorkloadFailure),
    /// Another worker owns the run now; this worker must walk away.
    LeaseLost,
}

impl From<WorkloadFailure> for StepError {
    fn from(value: WorkloadFailure) -> Self {
        Self::Failed(value)
    }
}

/// Executes claimed runs through the RunWorkload and Cleanup steps.
#[derive(Clone)]
pub struct WorkflowRunner {
    repository: Arc<dyn WorkflowRunRepository>,
    compute_platform: Arc<dyn ComputePlatform>,
    lock_store: Arc<dyn LockStore>,
    cleanup_handler: CleanupHandler,
    config: WorkflowRunnerConfig,
}

impl WorkflowRunner {
    /// Creates a workflow runner.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WorkflowRunRepository>,
        compute_platform: Arc<dyn ComputePlatform>,
        lock_store: Arc<dyn LockStore>,
        cleanup_handler: CleanupHandler,
        config: WorkflowRunnerConfig,
    ) -> Self {
        Self {
            repository,
            compute_platform,
            lock_store,
            cleanup_handler,
            config,
        }
    }

    /// Leases up to `limit` runs for one worker.
    pub async fn claim_runs(
        &self,
        worker_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ClaimedWorkflowRun>> {
        if worker_id.trim().is_empty() {
            return Err(AppError::Validation(
                "worker_id must not be empty".to_owned(),
            ));
        }

        if limit == 0 {
            return Ok(Vec::new());
        }

        self.repository
            .claim_runs(worker_id, limit, self.config.lease_seconds)
            .await
    }

    /// Drives one leased run to a terminal state.
    ///
    /// Returns a conflict error when the lease was taken over mid-run; the
    /// new lease holder finishes the run.
    pub async fn execute_claimed_run(&self, run: ClaimedWorkflowRun) -> AppResult<WorkflowRun> {
        if run.task.is_none()
            && !run.stop_requested
            && let ownership::RunOwnership::Superseded(active_reference) =
                self.resolve_ownership(&run).await
        {
            info!(
                execution_reference = %run.execution_reference,
                active_reference = %active_reference,
                "run lost the lifecycle lock at submission; finishing without launch"
            );
            let completed = self
                .complete(
                    &run,
                    WorkflowRunState::Succeeded,
                    Some(format!(
                        "superseded by active run '{active_reference}'"
                    )),
                )
                .await;
            self.release_if_held_by_superseded(&run).await;
            return completed;
        }

        match self.run_workload_step(&run).await {
            Ok(()) => {
                info!(execution_reference = %run.execution_reference, "workload completed");
                self.complete(&run, WorkflowRunState::Succeeded, None).await
            }
            Err(StepError::LeaseLost) => {
                warn!(
                    execution_reference = %run.execution_reference,
                    "run lease was taken over; abandoning supervision"
                );
                Err(AppError::Conflict(format!(
                    "lease for run '{}' is no longer held",
                    run.execution_reference
                )))
            }
            Err(StepError::Failed(failure)) => self.cleanup_after_failure(&run, failure).await,
        }
    }

    async fn run_workload_step(&self, run: &ClaimedWorkflowRun) -> Result<(), StepError> {
        self.repository
            .record_step(run, WorkflowStep::RunWorkload)
            .await
            .map_err(|error| WorkloadFailure::Internal(error.to_string()))?;

        let task = match run.task.clone() {
            Some(task) => {
                info!(
                    execution_reference = %run.execution_reference,
                    task_id = task.task_id(),
                    "resuming supervision of launched workload"
                );
                task
            }
            None => {
                if run.stop_requested {
                    return Err(WorkloadFailure::Terminated.into());
                }
                self.launch(run).await?
            }
        };

        self.supervise(run, &task).await
    }

    async fn launch(&self, run: &ClaimedWorkflowRun) -> Result<TaskHandle, StepError> {
        let task = self
            .compute_platform
            .launch_task(&self.config.workload)
            .await
            .map_err(|error| WorkloadFailure::Platform(error.to_string()))?;

        info!(
            execution_reference = %run.execution_reference,
            cluster_id = task.cluster_id(),
            task_id = task.task_id(),
            "workload task launched"
        );

        if let Err(record_error) = self.repository.record_task(run, &task).await {
            self.stop_task_best_effort(&task, "workflow engine could not record task")
                .await;
            return Err(WorkloadFailure::Internal(record_error.to_string()).into());
        }

        Ok(task)
    }

    async fn cleanup_after_failure(
        &self,
        run: &ClaimedWorkflowRun,
        failure: WorkloadFailure,
    ) -> AppResult<WorkflowRun> {
        warn!(
            execution_reference = %run.execution_reference,
            failure = %failure,
            "run workload step failed; entering cleanup"
        );

        if let Err(step_error) = self.repository.record_step(run, WorkflowStep::Cleanup).await {
            warn!(
                execution_reference = %run.execution_reference,
                error = %step_error,
                "failed to record cleanup step"
            );
        }

        match self
            .cleanup_handler
            .run_cleanup(&run.execution_reference)
            .await
        {
            CleanupOutcome::Released { .. } => {
                self.complete(run, WorkflowRunState::Succeeded, Some(failure.to_string()))
                    .await
            }
            CleanupOutcome::Failed {
                attempts,
                last_error,
            } => {
                error!(
                    execution_reference = %run.execution_reference,
                    attempts,
                    error = %last_error,
                    "cleanup failed; run needs operator attention"
                );
                self.complete(
                    run,
                    WorkflowRunState::Failed,
                    Some(format!(
                        "{failure}; cleanup failed after {attempts} attempt(s): {last_error}"
                    )),
                )
                .await
            }
        }
    }

    async fn stop_task_best_effort(&self, task: &TaskHandle, reason: &str) {
        if let Err(stop_error) = self.compute_platform.stop_task(task, reason).await {
            warn!(
                task_id = task.task_id(),
                error = %stop_error,
                "failed to stop workload task"
            );
        }
    }

    async fn complete(
        &self,
        run: &ClaimedWorkflowRun,
        state: WorkflowRunState,
        failure_reason: Option<String>,
    ) -> AppResult<WorkflowRun> {
        self.repository
            .complete_run(CompleteWorkflowRunInput {
                execution_reference: run.execution_reference.clone(),
                lease_token: run.lease_token.clone(),
                state,
                failure_reason,
            })
            .await
    }
}

#[cfg(test)]
mod tests;
