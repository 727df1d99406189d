use ondemand_domain::ExecutionReference;
use tokio::time::Instant;

use super::*;

const OWNERSHIP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Lock ownership as seen by a freshly claimed run.
#[derive(Debug)]
pub(super) enum RunOwnership {
    /// The lock names this run.
    Owned,
    /// Another run still held the lock when the grace period ran out.
    Superseded(ExecutionReference),
    /// The lock never named any run within the grace period.
    Unconfirmed,
}

impl WorkflowRunner {
    /// Waits for the start request that submitted `run` to settle its acquire.
    ///
    /// Only `Owned` ends the wait early. The holder seen by the last read at
    /// the deadline decides between `Superseded` and `Unconfirmed`, since a
    /// stop can free the lock for this run's acquire while the grace runs.
    /// Store read failures count as unconfirmed so an outage never blocks a launch.
    pub(super) async fn resolve_ownership(&self, run: &ClaimedWorkflowRun) -> RunOwnership {
        let deadline = Instant::now() + self.config.ownership_grace;

        loop {
            let active_reference = match self.lock_store.read().await {
                Ok(Some(record)) if record.is_held_by(&run.execution_reference) => {
                    return RunOwnership::Owned;
                }
                Ok(Some(record)) if record.in_progress() => record.execution_reference().cloned(),
                Ok(_) => None,
                Err(read_error) => {
                    warn!(
                        execution_reference = %run.execution_reference,
                        error = %read_error,
                        "failed to read lifecycle lock while checking ownership"
                    );
                    None
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return match active_reference {
                    Some(active_reference) => RunOwnership::Superseded(active_reference),
                    None => {
                        info!(
                            execution_reference = %run.execution_reference,
                            "lifecycle lock ownership unconfirmed; proceeding with launch"
                        );
                        RunOwnership::Unconfirmed
                    }
                };
            }

            tokio::time::sleep(OWNERSHIP_CHECK_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Releases the lock if a late acquire made it name a superseded run.
    ///
    /// Nothing was launched for the run, so a lock naming it would stay
    /// held until an explicit stop.
    pub(super) async fn release_if_held_by_superseded(&self, run: &ClaimedWorkflowRun) {
        match self.lock_store.read().await {
            Ok(Some(record)) if record.is_held_by(&run.execution_reference) => {
                warn!(
                    execution_reference = %run.execution_reference,
                    "lifecycle lock names a superseded run; releasing"
                );
                if let CleanupOutcome::Failed { last_error, .. } = self
                    .cleanup_handler
                    .run_cleanup(&run.execution_reference)
                    .await
                {
                    error!(
                        execution_reference = %run.execution_reference,
                        error = %last_error,
                        "failed to release lock held by superseded run"
                    );
                }
            }
            Ok(_) => {}
            Err(read_error) => {
                warn!(
                    execution_reference = %run.execution_reference,
                    error = %read_error,
                    "failed to re-read lifecycle lock after superseded run"
                );
            }
        }
    }
}
