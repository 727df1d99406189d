use chrono::Utc;
use ondemand_domain::TaskStatus;

use super::*;

impl WorkflowRunner {
    /// Polls the launched task until it stops, a stop is requested, the run
    /// times out, or the lease is lost.
    ///
    /// Engine bookkeeping errors are logged and retried on the next poll.
    /// Platform status errors end the step.
    pub(super) async fn supervise(
        &self,
        run: &ClaimedWorkflowRun,
        task: &TaskHandle,
    ) -> Result<(), StepError> {
        loop {
            match self
                .repository
                .renew_lease(run, self.config.lease_seconds)
                .await
            {
                Ok(true) => {}
                Ok(false) => return Err(StepError::LeaseLost),
                Err(renew_error) => {
                    warn!(
                        execution_reference = %run.execution_reference,
                        error = %renew_error,
                        "failed to renew run lease"
                    );
                }
            }

            match self
                .repository
                .is_stop_requested(&run.execution_reference)
                .await
            {
                Ok(true) => {
                    self.stop_task_best_effort(task, "stop requested").await;
                    return Err(WorkloadFailure::Terminated.into());
                }
                Ok(false) => {}
                Err(read_error) => {
                    warn!(
                        execution_reference = %run.execution_reference,
                        error = %read_error,
                        "failed to read stop request"
                    );
                }
            }

            if let Some(max_run_duration) = self.config.max_run_duration
                && elapsed_since(run) >= max_run_duration
            {
                self.stop_task_best_effort(task, "maximum run duration exceeded")
                    .await;
                return Err(WorkloadFailure::TimedOut {
                    after_seconds: max_run_duration.as_secs(),
                }
                .into());
            }

            match self.compute_platform.task_status(task).await {
                Ok(TaskStatus::Provisioning | TaskStatus::Running) => {}
                Ok(status @ TaskStatus::Stopped { .. }) if status.is_clean_exit() => {
                    return Ok(());
                }
                Ok(TaskStatus::Stopped { exit_code, reason }) => {
                    return Err(WorkloadFailure::Exited { exit_code, reason }.into());
                }
                Err(status_error) => {
                    self.stop_task_best_effort(task, "task status unavailable")
                        .await;
                    return Err(WorkloadFailure::Platform(status_error.to_string()).into());
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

fn elapsed_since(run: &ClaimedWorkflowRun) -> Duration {
    (Utc::now() - run.started_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
