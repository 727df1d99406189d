use super::*;

impl PostgresWorkflowEngine {
    pub(super) async fn claim_runs_impl(
        &self,
        worker_id: &str,
        limit: usize,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedWorkflowRun>> {
        if lease_seconds == 0 {
            return Err(AppError::Validation(
                "workflow lease_seconds must be greater than zero".to_owned(),
            ));
        }

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start workflow run claim transaction: {error}"
            ))
        })?;

        let rows = sqlx::query_as::<_, ClaimedWorkflowRunRow>(
            r#"
            WITH candidate_runs AS (
                SELECT id
                FROM workflow_runs
                WHERE state = 'queued'
                   OR (state = 'running' AND lease_expires_at < now())
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE workflow_runs runs
            SET
                state = 'running',
                leased_by = $2,
                lease_token = gen_random_uuid()::TEXT,
                lease_expires_at = now() + make_interval(secs => $3::INT),
                started_at = COALESCE(runs.started_at, now()),
                updated_at = now()
            FROM candidate_runs
            WHERE runs.id = candidate_runs.id
            RETURNING
                runs.id,
                runs.lease_token,
                runs.task_cluster_id,
                runs.task_id,
                runs.stop_requested_at IS NOT NULL AS stop_requested,
                runs.started_at
            "#,
        )
        .bind(i64::try_from(limit).map_err(|error| {
            AppError::Validation(format!("invalid workflow claim limit: {error}"))
        })?)
        .bind(worker_id)
        .bind(i32::try_from(lease_seconds).map_err(|error| {
            AppError::Validation(format!("invalid workflow lease_seconds: {error}"))
        })?)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to claim workflow runs for worker '{worker_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit workflow run claim transaction: {error}"
            ))
        })?;

        rows.into_iter().map(claimed_run_from_row).collect()
    }

    pub(super) async fn renew_lease_impl(
        &self,
        run: &ClaimedWorkflowRun,
        lease_seconds: u32,
    ) -> AppResult<bool> {
        let run_id = parse_run_id(&run.execution_reference)?;
        let result = sqlx::query(
            r#"
            UPDATE workflow_runs
            SET
                lease_expires_at = now() + make_interval(secs => $3::INT),
                updated_at = now()
            WHERE id = $1
              AND lease_token = $2
              AND state = 'running'
            "#,
        )
        .bind(run_id)
        .bind(run.lease_token.as_str())
        .bind(i32::try_from(lease_seconds).map_err(|error| {
            AppError::Validation(format!("invalid workflow lease_seconds: {error}"))
        })?)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to renew lease for workflow run '{}': {error}",
                run.execution_reference
            ))
        })?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn record_step_impl(
        &self,
        run: &ClaimedWorkflowRun,
        step: WorkflowStep,
    ) -> AppResult<()> {
        let run_id = parse_run_id(&run.execution_reference)?;
        let result = sqlx::query(
            r#"
            UPDATE workflow_runs
            SET current_step = $3, updated_at = now()
            WHERE id = $1
              AND lease_token = $2
              AND state = 'running'
            "#,
        )
        .bind(run_id)
        .bind(run.lease_token.as_str())
        .bind(step.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record step '{}' for workflow run '{}': {error}",
                step.as_str(),
                run.execution_reference
            ))
        })?;

        ensure_leased(result.rows_affected(), run)
    }

    pub(super) async fn record_task_impl(
        &self,
        run: &ClaimedWorkflowRun,
        task: &TaskHandle,
    ) -> AppResult<()> {
        let run_id = parse_run_id(&run.execution_reference)?;
        let result = sqlx::query(
            r#"
            UPDATE workflow_runs
            SET task_cluster_id = $3, task_id = $4, updated_at = now()
            WHERE id = $1
              AND lease_token = $2
              AND state = 'running'
            "#,
        )
        .bind(run_id)
        .bind(run.lease_token.as_str())
        .bind(task.cluster_id())
        .bind(task.task_id())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record task for workflow run '{}': {error}",
                run.execution_reference
            ))
        })?;

        ensure_leased(result.rows_affected(), run)
    }

    pub(super) async fn is_stop_requested_impl(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<bool> {
        let run_id = parse_run_id(execution_reference)?;
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT stop_requested_at IS NOT NULL
            FROM workflow_runs
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to read stop request for workflow run '{execution_reference}': {error}"
            ))
        })?
        .ok_or_else(|| {
            AppError::Internal(format!(
                "workflow run '{execution_reference}' does not exist"
            ))
        })
    }

    pub(super) async fn complete_run_impl(
        &self,
        input: CompleteWorkflowRunInput,
    ) -> AppResult<WorkflowRun> {
        if !input.state.is_terminal() {
            return Err(AppError::Validation(format!(
                "workflow run cannot complete in non-terminal state '{}'",
                input.state.as_str()
            )));
        }

        let run_id = parse_run_id(&input.execution_reference)?;
        let row = sqlx::query_as::<_, WorkflowRunRow>(
            r#"
            UPDATE workflow_runs
            SET
                state = $3,
                failure_reason = $4,
                finished_at = now(),
                leased_by = NULL,
                lease_token = NULL,
                lease_expires_at = NULL,
                updated_at = now()
            WHERE id = $1
              AND lease_token = $2
              AND state = 'running'
            RETURNING
                id,
                state,
                current_step,
                task_cluster_id,
                task_id,
                failure_reason,
                created_at,
                finished_at
            "#,
        )
        .bind(run_id)
        .bind(input.lease_token.as_str())
        .bind(input.state.as_str())
        .bind(input.failure_reason.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to complete workflow run '{}': {error}",
                input.execution_reference
            ))
        })?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "workflow run '{}' is not leased with matching lease token",
                input.execution_reference
            ))
        })?;

        workflow_run_from_row(row)
    }
}

fn ensure_leased(rows_affected: u64, run: &ClaimedWorkflowRun) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "workflow run '{}' is not leased with matching lease token",
            run.execution_reference
        )));
    }

    Ok(())
}
