use std::time::Duration;

use ondemand_application::{ClaimedWorkflowRun, WorkflowRun, WorkflowRunner};
use ondemand_core::AppResult;
use ondemand_domain::ExecutionReference;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::worker_config::WorkerConfig;

type RunResult = (ExecutionReference, AppResult<WorkflowRun>);

/// Claims runs until interrupted, executing each on its own task.
///
/// At most `claim_limit` runs are in flight. On shutdown in-flight runs are
/// aborted; their leases expire and another worker resumes them.
pub async fn run(runner: WorkflowRunner, config: &WorkerConfig) {
    let mut in_flight: JoinSet<RunResult> = JoinSet::new();
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        while let Some(joined) = in_flight.try_join_next() {
            log_finished_run(config.worker_id.as_str(), joined);
        }

        let available = config.claim_limit.saturating_sub(in_flight.len());
        if available > 0 {
            match runner
                .claim_runs(config.worker_id.as_str(), available)
                .await
            {
                Ok(claimed_runs) => {
                    if !claimed_runs.is_empty() {
                        info!(
                            worker_id = %config.worker_id,
                            claimed_count = claimed_runs.len(),
                            "claimed workflow runs"
                        );
                    }
                    for claimed_run in claimed_runs {
                        spawn_run(&mut in_flight, runner.clone(), claimed_run);
                    }
                }
                Err(error) => {
                    warn!(
                        worker_id = %config.worker_id,
                        error = %error,
                        "failed to claim workflow runs"
                    );
                }
            }
        }

        tokio::select! {
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(error = %error, "failed to listen for shutdown signal");
                }
                break;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_finished_run(config.worker_id.as_str(), joined);
            }
            () = tokio::time::sleep(poll_interval) => {}
        }
    }

    info!(
        worker_id = %config.worker_id,
        in_flight = in_flight.len(),
        "ondemand-worker shutting down"
    );
    in_flight.shutdown().await;
}

fn spawn_run(
    in_flight: &mut JoinSet<RunResult>,
    runner: WorkflowRunner,
    claimed_run: ClaimedWorkflowRun,
) {
    let execution_reference = claimed_run.execution_reference.clone();
    in_flight.spawn(async move {
        let result = runner.execute_claimed_run(claimed_run).await;
        (execution_reference, result)
    });
}

fn log_finished_run(worker_id: &str, joined: Result<RunResult, tokio::task::JoinError>) {
    match joined {
        Ok((execution_reference, Ok(run))) => {
            info!(
                worker_id,
                execution_reference = %execution_reference,
                state = run.state.as_str(),
                failure_reason = run.failure_reason.as_deref(),
                "workflow run finished"
            );
        }
        Ok((execution_reference, Err(error))) => {
            warn!(
                worker_id,
                execution_reference = %execution_reference,
                error = %error,
                "workflow run execution failed"
            );
        }
        Err(error) => {
            warn!(worker_id, error = %error, "workflow run task panicked or was aborted");
        }
    }
}
