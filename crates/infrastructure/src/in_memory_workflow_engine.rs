use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ondemand_application::{
    ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowEngine, WorkflowRun,
    WorkflowRunRepository,
};
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{ExecutionReference, TaskHandle, WorkflowRunState, WorkflowStep};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct RunLease {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct RunEntry {
    run: WorkflowRun,
    stop_requested: bool,
    lease: Option<RunLease>,
    started_at: Option<DateTime<Utc>>,
}

impl RunEntry {
    fn is_claimable(&self, now: Instant) -> bool {
        match self.run.state {
            WorkflowRunState::Queued => true,
            WorkflowRunState::Running => self
                .lease
                .as_ref()
                .is_none_or(|lease| lease.expires_at <= now),
            WorkflowRunState::Succeeded | WorkflowRunState::Failed => false,
        }
    }

    fn is_leased_by(&self, lease_token: &str) -> bool {
        self.run.state == WorkflowRunState::Running
            && self
                .lease
                .as_ref()
                .is_some_and(|lease| lease.token == lease_token)
    }
}

/// In-process workflow engine for tests and single-node development.
#[derive(Default)]
pub struct InMemoryWorkflowEngine {
    runs: RwLock<Vec<RunEntry>>,
}

impl InMemoryWorkflowEngine {
    /// Creates an empty workflow engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds one run by reference.
    pub async fn find_run(&self, execution_reference: &ExecutionReference) -> Option<WorkflowRun> {
        self.runs
            .read()
            .await
            .iter()
            .find(|entry| &entry.run.execution_reference == execution_reference)
            .map(|entry| entry.run.clone())
    }
}

fn leased_entry<'a>(
    entries: &'a mut [RunEntry],
    run: &ClaimedWorkflowRun,
) -> AppResult<&'a mut RunEntry> {
    entries
        .iter_mut()
        .find(|entry| {
            entry.run.execution_reference == run.execution_reference
                && entry.is_leased_by(run.lease_token.as_str())
        })
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "workflow run '{}' is not leased with matching lease token",
                run.execution_reference
            ))
        })
}

#[async_trait]
impl WorkflowEngine for InMemoryWorkflowEngine {
    async fn start_run(&self) -> AppResult<ExecutionReference> {
        let execution_reference = ExecutionReference::new(uuid::Uuid::new_v4().to_string())?;

        self.runs.write().await.push(RunEntry {
            run: WorkflowRun {
                execution_reference: execution_reference.clone(),
                state: WorkflowRunState::Queued,
                current_step: None,
                task: None,
                failure_reason: None,
                created_at: Utc::now(),
                finished_at: None,
            },
            stop_requested: false,
            lease: None,
            started_at: None,
        });

        Ok(execution_reference)
    }

    async fn stop_run(&self, execution_reference: &ExecutionReference) -> AppResult<()> {
        let mut runs = self.runs.write().await;
        let entry = runs
            .iter_mut()
            .find(|entry| &entry.run.execution_reference == execution_reference)
            .ok_or_else(|| {
                AppError::WorkflowTerminationFailed(format!(
                    "workflow run '{execution_reference}' does not exist"
                ))
            })?;

        entry.stop_requested = true;
        Ok(())
    }
}

#[async_trait]
impl WorkflowRunRepository for InMemoryWorkflowEngine {
    async fn claim_runs(
        &self,
        _worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedWorkflowRun>> {
        let now = Instant::now();
        let lease_duration = Duration::from_secs(u64::from(lease_seconds));
        let mut runs = self.runs.write().await;

        let claimed = runs
            .iter_mut()
            .filter(|entry| entry.is_claimable(now))
            .take(limit)
            .map(|entry| {
                let token = uuid::Uuid::new_v4().to_string();
                entry.run.state = WorkflowRunState::Running;
                entry.lease = Some(RunLease {
                    token: token.clone(),
                    expires_at: now + lease_duration,
                });
                let started_at = *entry.started_at.get_or_insert_with(Utc::now);

                ClaimedWorkflowRun {
                    execution_reference: entry.run.execution_reference.clone(),
                    lease_token: token,
                    task: entry.run.task.clone(),
                    stop_requested: entry.stop_requested,
                    started_at,
                }
            })
            .collect();

        Ok(claimed)
    }

    async fn renew_lease(&self, run: &ClaimedWorkflowRun, lease_seconds: u32) -> AppResult<bool> {
        let mut runs = self.runs.write().await;
        let Ok(entry) = leased_entry(&mut runs, run) else {
            return Ok(false);
        };

        entry.lease = Some(RunLease {
            token: run.lease_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(u64::from(lease_seconds)),
        });
        Ok(true)
    }

    async fn record_step(&self, run: &ClaimedWorkflowRun, step: WorkflowStep) -> AppResult<()> {
        let mut runs = self.runs.write().await;
        leased_entry(&mut runs, run)?.run.current_step = Some(step);
        Ok(())
    }

    async fn record_task(&self, run: &ClaimedWorkflowRun, task: &TaskHandle) -> AppResult<()> {
        let mut runs = self.runs.write().await;
        leased_entry(&mut runs, run)?.run.task = Some(task.clone());
        Ok(())
    }

    async fn is_stop_requested(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<bool> {
        self.runs
            .read()
            .await
            .iter()
            .find(|entry| &entry.run.execution_reference == execution_reference)
            .map(|entry| entry.stop_requested)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "workflow run '{execution_reference}' does not exist"
                ))
            })
    }

    async fn complete_run(&self, input: CompleteWorkflowRunInput) -> AppResult<WorkflowRun> {
        if !input.state.is_terminal() {
            return Err(AppError::Validation(format!(
                "workflow run cannot complete in non-terminal state '{}'",
                input.state.as_str()
            )));
        }

        let mut runs = self.runs.write().await;
        let entry = runs
            .iter_mut()
            .find(|entry| {
                entry.run.execution_reference == input.execution_reference
                    && entry.is_leased_by(input.lease_token.as_str())
            })
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "workflow run '{}' is not leased with matching lease token",
                    input.execution_reference
                ))
            })?;

        entry.run.state = input.state;
        entry.run.failure_reason = input.failure_reason;
        entry.run.finished_at = Some(Utc::now());
        entry.lease = None;

        Ok(entry.run.clone())
    }
}
