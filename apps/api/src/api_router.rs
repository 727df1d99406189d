use axum::Router;
use axum::routing::{get, post};
use ondemand_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

mod cors;
mod events;

pub fn build_router(
    app_state: AppState,
    cors_allowed_origin: Option<&str>,
) -> Result<Router, AppError> {
    let server_routes = Router::new()
        .route(
            "/v1/server/start",
            post(handlers::server::start_server_handler),
        )
        .route("/v1/server/stop", post(handlers::server::stop_server_handler))
        .route(
            "/v1/server/status",
            get(handlers::server::server_status_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(server_routes)
        .merge(events::build_event_routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(cors_allowed_origin)?)
        .with_state(app_state))
}
