use std::sync::Arc;
use std::time::Duration;

use ondemand_application::{EndpointPublisher, LifecycleService};
use ondemand_core::AppError;
use ondemand_infrastructure::{HttpComputePlatform, HttpNamingService, PostgresWorkflowEngine};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::lock_store::build_lock_store;
use super::redis::build_redis_client;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(build_redis_client)
        .transpose()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let lock_store = build_lock_store(&pool, config, redis_client.clone())?;
    let workflow_engine = Arc::new(PostgresWorkflowEngine::new(pool.clone()));
    let compute_platform = Arc::new(HttpComputePlatform::new(
        http_client.clone(),
        &config.compute_api_base_url,
        config.compute_api_token.clone(),
    )?);
    let naming_service = Arc::new(HttpNamingService::new(
        http_client,
        &config.naming_api_base_url,
        config.naming_zone_id.clone(),
        config.naming_api_token.clone(),
    )?);

    Ok(AppState {
        lifecycle_service: LifecycleService::new(lock_store, workflow_engine),
        endpoint_publisher: EndpointPublisher::new(
            compute_platform,
            naming_service,
            config.server_domain_name.clone(),
            config.server_record_ttl_seconds,
        )?,
        event_shared_secret: config.event_shared_secret.clone(),
        postgres_pool: pool,
        redis_client,
        redis_required: config.requires_redis(),
    })
}
