use std::sync::Arc;

use chrono::{DateTime, Utc};
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{AcquireOutcome, ExecutionReference, ServerStatus};
use tracing::{info, warn};

use crate::lifecycle_ports::{LockStore, WorkflowEngine};

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartServerOutcome {
    /// The lock was free and now names the new run.
    Starting {
        /// Run that owns the lock.
        execution_reference: ExecutionReference,
    },
    /// Another run holds the lock. The submitted run is left to reconcile itself.
    AlreadyActive {
        /// Run submitted by this request.
        submitted_reference: ExecutionReference,
        /// Run holding the lock, when the follow-up read succeeded.
        active_reference: Option<ExecutionReference>,
    },
}

impl StartServerOutcome {
    /// Returns the status reported to the caller.
    #[must_use]
    pub fn server_status(&self) -> ServerStatus {
        match self {
            Self::Starting { .. } => ServerStatus::Starting,
            Self::AlreadyActive { .. } => ServerStatus::Online,
        }
    }
}

/// Result of an accepted stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopServerOutcome {
    /// Run that was asked to terminate.
    pub execution_reference: ExecutionReference,
}

/// Read-only view of the lock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatusView {
    /// Online when a run holds the lock, offline otherwise.
    pub status: ServerStatus,
    /// Active run reference.
    pub execution_reference: Option<ExecutionReference>,
    /// Last lock write, absent when the record was never written.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Front-door service for start, stop and status requests.
#[derive(Clone)]
pub struct LifecycleService {
    lock_store: Arc<dyn LockStore>,
    workflow_engine: Arc<dyn WorkflowEngine>,
}

impl LifecycleService {
    /// Creates a lifecycle service.
    #[must_use]
    pub fn new(lock_store: Arc<dyn LockStore>, workflow_engine: Arc<dyn WorkflowEngine>) -> Self {
        Self {
            lock_store,
            workflow_engine,
        }
    }

    /// Submits a new run, then tries to take the lock for it.
    ///
    /// The run is submitted before the acquire. When the acquire loses, the
    /// submitted run detects that it does not own the lock and finishes
    /// without launching anything.
    pub async fn start_server(&self) -> AppResult<StartServerOutcome> {
        let execution_reference = self.workflow_engine.start_run().await?;

        match self
            .lock_store
            .conditional_acquire(&execution_reference)
            .await?
        {
            AcquireOutcome::Acquired => {
                info!(execution_reference = %execution_reference, "server start accepted");
                Ok(StartServerOutcome::Starting {
                    execution_reference,
                })
            }
            AcquireOutcome::AlreadyActive => {
                let active_reference = match self.lock_store.read().await {
                    Ok(record) => record.and_then(|record| record.execution_reference().cloned()),
                    Err(error) => {
                        warn!(error = %error, "failed to read active run after lost acquire");
                        None
                    }
                };

                info!(
                    submitted_reference = %execution_reference,
                    active_reference = active_reference.as_ref().map(ExecutionReference::as_str),
                    "server already active"
                );

                Ok(StartServerOutcome::AlreadyActive {
                    submitted_reference: execution_reference,
                    active_reference,
                })
            }
        }
    }

    /// Terminates the active run and releases the lock.
    ///
    /// Release is attempted even when termination fails; the termination
    /// error is reported first.
    pub async fn stop_server(&self) -> AppResult<StopServerOutcome> {
        let record = self.lock_store.read().await?;
        let Some(execution_reference) = record
            .as_ref()
            .and_then(|record| record.execution_reference())
            .cloned()
        else {
            return Err(AppError::NotRunning);
        };

        let termination = self.workflow_engine.stop_run(&execution_reference).await;
        if let Err(error) = &termination {
            warn!(
                execution_reference = %execution_reference,
                error = %error,
                "run termination failed; releasing lock anyway"
            );
        }

        let release = self.lock_store.release().await;
        termination?;
        release?;

        info!(execution_reference = %execution_reference, "server stop accepted");
        Ok(StopServerOutcome {
            execution_reference,
        })
    }

    /// Returns the current lock state.
    pub async fn server_status(&self) -> AppResult<ServerStatusView> {
        let record = self.lock_store.read().await?;

        Ok(match record {
            Some(record) if record.in_progress() => ServerStatusView {
                status: ServerStatus::Online,
                execution_reference: record.execution_reference().cloned(),
                updated_at: Some(record.updated_at()),
            },
            Some(record) => ServerStatusView {
                status: ServerStatus::Offline,
                execution_reference: None,
                updated_at: Some(record.updated_at()),
            },
            None => ServerStatusView {
                status: ServerStatus::Offline,
                execution_reference: None,
                updated_at: None,
            },
        })
    }
}

#[cfg(test)]
mod tests;
