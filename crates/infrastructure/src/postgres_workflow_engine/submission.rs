use super::*;

impl PostgresWorkflowEngine {
    pub(super) async fn start_run_impl(&self) -> AppResult<ExecutionReference> {
        let run_id = uuid::Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO workflow_runs (id, state, created_at, updated_at)
            VALUES ($1, 'queued', now(), now())
            "#,
        )
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::WorkflowSubmissionFailed(format!(
                "failed to queue workflow run: {error}"
            ))
        })?;

        run_reference(run_id)
    }

    pub(super) async fn stop_run_impl(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<()> {
        let run_id = parse_run_id(execution_reference).map_err(|error| {
            AppError::WorkflowTerminationFailed(error.to_string())
        })?;

        let state = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE workflow_runs
            SET
                stop_requested_at = COALESCE(stop_requested_at, now()),
                updated_at = now()
            WHERE id = $1
            RETURNING state
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::WorkflowTerminationFailed(format!(
                "failed to request stop for workflow run '{execution_reference}': {error}"
            ))
        })?;

        match state {
            Some(_) => Ok(()),
            None => Err(AppError::WorkflowTerminationFailed(format!(
                "workflow run '{execution_reference}' does not exist"
            ))),
        }
    }
}
