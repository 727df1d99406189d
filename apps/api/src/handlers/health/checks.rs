use ondemand_application::LifecycleService;
use redis::AsyncCommands;

use super::*;

/// Reads the lifecycle lock through the configured lock store.
///
/// Returns the lock check together with the server status it implies.
pub(super) async fn check_lock_store(
    lifecycle_service: &LifecycleService,
) -> (HealthDependencyStatus, Option<&'static str>) {
    match lifecycle_service.server_status().await {
        Ok(view) => (
            HealthDependencyStatus {
                status: "ok",
                detail: view
                    .execution_reference
                    .map(|reference| format!("held by run '{reference}'")),
            },
            Some(view.status.as_str()),
        ),
        Err(error) => (
            HealthDependencyStatus {
                status: "error",
                detail: Some(format!("lock store read failed: {error}")),
            },
            None,
        ),
    }
}

pub(super) async fn check_postgres(pool: sqlx::PgPool) -> HealthDependencyStatus {
    let check = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM lifecycle_lock WHERE id = $1)",
    )
    .bind(ondemand_domain::LOCK_RECORD_ID)
    .fetch_one(&pool)
    .await;

    match check {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}

pub(super) async fn check_redis(
    redis_client: Option<redis::Client>,
    redis_required: bool,
) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return if redis_required {
            HealthDependencyStatus {
                status: "error",
                detail: Some("redis client is not configured".to_owned()),
            }
        } else {
            HealthDependencyStatus {
                status: "disabled",
                detail: None,
            }
        };
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => {
            return HealthDependencyStatus {
                status: "error",
                detail: Some(format!("redis connection failed: {error}")),
            };
        }
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Ok(value) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("unexpected redis ping response: {value}")),
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("redis ping failed: {error}")),
        },
    }
}
