//! On-demand server controller workflow worker.

#![forbid(unsafe_code)]

mod worker_config;
mod worker_runtime;

use std::sync::Arc;
use std::time::Duration;

use ondemand_application::{CleanupHandler, LockStore, WorkflowRunner, WorkflowRunnerConfig};
use ondemand_core::{AppError, AppResult};
use ondemand_infrastructure::{
    HttpComputePlatform, PostgresLockStore, PostgresWorkflowEngine, RedisLockStore,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::worker_config::{LockStoreBackend, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let runner = build_workflow_runner(pool, &config)?;

    info!(
        worker_id = %config.worker_id,
        claim_limit = config.claim_limit,
        lease_seconds = config.lease_seconds,
        poll_interval_ms = config.poll_interval_ms,
        lock_store_backend = config.lock_store_backend.as_str(),
        "ondemand-worker started"
    );

    worker_runtime::run(runner, &config).await;
    Ok(())
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_workflow_runner(pool: PgPool, config: &WorkerConfig) -> AppResult<WorkflowRunner> {
    let lock_store: Arc<dyn LockStore> = match config.lock_store_backend {
        LockStoreBackend::Postgres => Arc::new(PostgresLockStore::new(pool.clone())),
        LockStoreBackend::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when LOCK_STORE_BACKEND=redis".to_owned(),
                )
            })?;
            let redis_client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            Arc::new(RedisLockStore::new(
                redis_client,
                config.redis_key_prefix.clone(),
            ))
        }
    };

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let compute_platform = Arc::new(HttpComputePlatform::new(
        http_client,
        &config.compute_api_base_url,
        config.compute_api_token.clone(),
    )?);

    let cleanup_handler = CleanupHandler::new(lock_store.clone()).with_retry_policy(
        config.cleanup_max_attempts,
        Duration::from_millis(config.cleanup_retry_backoff_ms),
    );

    Ok(WorkflowRunner::new(
        Arc::new(PostgresWorkflowEngine::new(pool)),
        compute_platform,
        lock_store,
        cleanup_handler,
        WorkflowRunnerConfig {
            workload: config.workload.clone(),
            poll_interval: Duration::from_millis(config.workload_poll_interval_ms),
            lease_seconds: config.lease_seconds,
            max_run_duration: (config.max_run_seconds > 0)
                .then(|| Duration::from_secs(config.max_run_seconds)),
            ownership_grace: Duration::from_secs(config.ownership_grace_seconds),
        },
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
