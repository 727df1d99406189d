use std::sync::Arc;

use ondemand_application::LockStore;
use ondemand_core::AppError;
use ondemand_infrastructure::{PostgresLockStore, RedisLockStore};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, LockStoreBackend};

pub(super) fn build_lock_store(
    pool: &PgPool,
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> Result<Arc<dyn LockStore>, AppError> {
    match config.lock_store_backend {
        LockStoreBackend::Postgres => Ok(Arc::new(PostgresLockStore::new(pool.clone()))),
        LockStoreBackend::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when LOCK_STORE_BACKEND=redis".to_owned(),
                )
            })?;
            Ok(Arc::new(RedisLockStore::new(
                redis_client,
                config.redis_key_prefix.clone(),
            )))
        }
    }
}
