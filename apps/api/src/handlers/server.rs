use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::dto::{ServerActionResponse, ServerStatusResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn start_server_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ServerActionResponse>) {
    let response = match state.lifecycle_service.start_server().await {
        Ok(outcome) => ServerActionResponse::from_start(&outcome),
        Err(error) => {
            warn!(error = %error, "server start failed");
            ServerActionResponse::from_error(&error)
        }
    };

    (response.http_status(), Json(response))
}

pub async fn stop_server_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ServerActionResponse>) {
    let response = match state.lifecycle_service.stop_server().await {
        Ok(outcome) => ServerActionResponse::from_stop(&outcome),
        Err(error) => {
            warn!(error = %error, "server stop failed");
            ServerActionResponse::from_error(&error)
        }
    };

    (response.http_status(), Json(response))
}

pub async fn server_status_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ServerStatusResponse>> {
    let status = state.lifecycle_service.server_status().await?;
    Ok(Json(ServerStatusResponse::from(status)))
}
