use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ondemand_application::LockStore;
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{AcquireOutcome, ExecutionReference, LOCK_RECORD_ID, LockRecord};
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed lifecycle lock store.
///
/// The conditional acquire is a single `INSERT .. ON CONFLICT DO UPDATE .. WHERE`
/// statement, so concurrent starts serialize on the row lock.
#[derive(Clone)]
pub struct PostgresLockStore {
    pool: PgPool,
}

impl PostgresLockStore {
    /// Creates a lock store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LockRecordRow {
    in_progress: bool,
    execution_reference: Option<String>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl LockStore for PostgresLockStore {
    async fn read(&self) -> AppResult<Option<LockRecord>> {
        let row = sqlx::query_as::<_, LockRecordRow>(
            r#"
            SELECT in_progress, execution_reference, updated_at
            FROM lifecycle_lock
            WHERE id = $1
            "#,
        )
        .bind(LOCK_RECORD_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to read lifecycle lock: {error}"))
        })?;

        row.map(lock_record_from_row).transpose()
    }

    async fn conditional_acquire(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<AcquireOutcome> {
        let acquired = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO lifecycle_lock (id, in_progress, execution_reference, updated_at)
            VALUES ($1, TRUE, $2, now())
            ON CONFLICT (id) DO UPDATE
            SET
                in_progress = TRUE,
                execution_reference = EXCLUDED.execution_reference,
                updated_at = now()
            WHERE lifecycle_lock.in_progress = FALSE
            RETURNING id
            "#,
        )
        .bind(LOCK_RECORD_ID)
        .bind(execution_reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to acquire lifecycle lock for run '{execution_reference}': {error}"
            ))
        })?;

        Ok(match acquired {
            Some(_) => AcquireOutcome::Acquired,
            None => AcquireOutcome::AlreadyActive,
        })
    }

    async fn release(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lifecycle_lock (id, in_progress, execution_reference, updated_at)
            VALUES ($1, FALSE, NULL, now())
            ON CONFLICT (id) DO UPDATE
            SET
                in_progress = FALSE,
                execution_reference = NULL,
                updated_at = now()
            "#,
        )
        .bind(LOCK_RECORD_ID)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to release lifecycle lock: {error}"))
        })?;

        Ok(())
    }
}

fn lock_record_from_row(row: LockRecordRow) -> AppResult<LockRecord> {
    let execution_reference = row
        .execution_reference
        .map(ExecutionReference::new)
        .transpose()?;

    Ok(LockRecord::from_parts(
        row.in_progress,
        execution_reference,
        row.updated_at,
    ))
}
