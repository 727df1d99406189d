use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ondemand_application::{
    ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowEngine, WorkflowRun,
    WorkflowRunRepository,
};
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{ExecutionReference, TaskHandle, WorkflowRunState, WorkflowStep};
use sqlx::{FromRow, PgPool};

mod runs;
mod submission;

/// PostgreSQL-backed durable workflow engine.
///
/// Runs are rows in `workflow_runs`; workers lease them with
/// `FOR UPDATE SKIP LOCKED` and fence every write with the lease token.
#[derive(Clone)]
pub struct PostgresWorkflowEngine {
    pool: PgPool,
}

impl PostgresWorkflowEngine {
    /// Creates a workflow engine with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds one run by reference.
    pub async fn find_run(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<Option<WorkflowRun>> {
        let run_id = parse_run_id(execution_reference)?;
        let row = sqlx::query_as::<_, WorkflowRunRow>(
            r#"
            SELECT
                id,
                state,
                current_step,
                task_cluster_id,
                task_id,
                failure_reason,
                created_at,
                finished_at
            FROM workflow_runs
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find workflow run '{execution_reference}': {error}"
            ))
        })?;

        row.map(workflow_run_from_row).transpose()
    }
}

#[derive(Debug, FromRow)]
struct WorkflowRunRow {
    id: uuid::Uuid,
    state: String,
    current_step: Option<String>,
    task_cluster_id: Option<String>,
    task_id: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ClaimedWorkflowRunRow {
    id: uuid::Uuid,
    lease_token: String,
    task_cluster_id: Option<String>,
    task_id: Option<String>,
    stop_requested: bool,
    started_at: DateTime<Utc>,
}

#[async_trait]
impl WorkflowEngine for PostgresWorkflowEngine {
    async fn start_run(&self) -> AppResult<ExecutionReference> {
        self.start_run_impl().await
    }

    async fn stop_run(&self, execution_reference: &ExecutionReference) -> AppResult<()> {
        self.stop_run_impl(execution_reference).await
    }
}

#[async_trait]
impl WorkflowRunRepository for PostgresWorkflowEngine {
    async fn claim_runs(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedWorkflowRun>> {
        self.claim_runs_impl(worker_id, limit, lease_seconds).await
    }

    async fn renew_lease(&self, run: &ClaimedWorkflowRun, lease_seconds: u32) -> AppResult<bool> {
        self.renew_lease_impl(run, lease_seconds).await
    }

    async fn record_step(&self, run: &ClaimedWorkflowRun, step: WorkflowStep) -> AppResult<()> {
        self.record_step_impl(run, step).await
    }

    async fn record_task(&self, run: &ClaimedWorkflowRun, task: &TaskHandle) -> AppResult<()> {
        self.record_task_impl(run, task).await
    }

    async fn is_stop_requested(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<bool> {
        self.is_stop_requested_impl(execution_reference).await
    }

    async fn complete_run(&self, input: CompleteWorkflowRunInput) -> AppResult<WorkflowRun> {
        self.complete_run_impl(input).await
    }
}

fn parse_run_id(execution_reference: &ExecutionReference) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(execution_reference.as_str()).map_err(|error| {
        AppError::Validation(format!(
            "invalid workflow run reference '{execution_reference}': {error}"
        ))
    })
}

fn run_reference(run_id: uuid::Uuid) -> AppResult<ExecutionReference> {
    ExecutionReference::new(run_id.to_string())
}

fn task_from_columns(
    task_cluster_id: Option<String>,
    task_id: Option<String>,
) -> AppResult<Option<TaskHandle>> {
    match (task_cluster_id, task_id) {
        (Some(cluster_id), Some(task_id)) => TaskHandle::new(cluster_id, task_id).map(Some),
        _ => Ok(None),
    }
}

fn workflow_run_from_row(row: WorkflowRunRow) -> AppResult<WorkflowRun> {
    Ok(WorkflowRun {
        execution_reference: run_reference(row.id)?,
        state: WorkflowRunState::parse(row.state.as_str())?,
        current_step: row
            .current_step
            .as_deref()
            .map(WorkflowStep::parse)
            .transpose()?,
        task: task_from_columns(row.task_cluster_id, row.task_id)?,
        failure_reason: row.failure_reason,
        created_at: row.created_at,
        finished_at: row.finished_at,
    })
}

fn claimed_run_from_row(row: ClaimedWorkflowRunRow) -> AppResult<ClaimedWorkflowRun> {
    Ok(ClaimedWorkflowRun {
        execution_reference: run_reference(row.id)?,
        lease_token: row.lease_token,
        task: task_from_columns(row.task_cluster_id, row.task_id)?,
        stop_requested: row.stop_requested,
        started_at: row.started_at,
    })
}
