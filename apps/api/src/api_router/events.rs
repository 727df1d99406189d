use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::post;

use crate::state::AppState;
use crate::{handlers, middleware};

pub(super) fn build_event_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/v1/events/workload-running",
            post(handlers::events::workload_running_handler),
        )
        .route_layer(from_fn_with_state(
            app_state,
            middleware::require_event_auth,
        ))
}
