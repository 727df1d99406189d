use axum::Json;
use axum::extract::State;
use tracing::info;

use crate::dto::{EventAcknowledgementResponse, WorkloadRunningEventRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn workload_running_handler(
    State(state): State<AppState>,
    Json(payload): Json<WorkloadRunningEventRequest>,
) -> ApiResult<Json<EventAcknowledgementResponse>> {
    let Some(event) = payload.into_running_event()? else {
        info!("ignored task state change that is not a running transition");
        return Ok(Json(EventAcknowledgementResponse::ignored()));
    };

    let record = state.endpoint_publisher.publish(&event).await?;
    Ok(Json(EventAcknowledgementResponse::from(record)))
}
