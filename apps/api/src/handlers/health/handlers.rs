use super::checks::{check_lock_store, check_postgres, check_redis};
use super::*;

/// Reports dependency health and the lifecycle lock as the server sees it.
///
/// Not ready when the lock store cannot be read, since start and stop would fail.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (lock_store, server_status) = check_lock_store(&state.lifecycle_service).await;
    let postgres = check_postgres(state.postgres_pool.clone()).await;
    let redis = check_redis(state.redis_client.clone(), state.redis_required).await;

    let dependencies_ready =
        postgres.status == "ok" && (redis.status == "ok" || !state.redis_required);
    let ready = dependencies_ready && lock_store.status == "ok";
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            ready,
            server_status,
            lock_store,
            postgres,
            redis,
        }),
    )
}
