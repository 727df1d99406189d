use ondemand_application::{EndpointPublisher, LifecycleService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle_service: LifecycleService,
    pub endpoint_publisher: EndpointPublisher,
    /// Bearer secret required on event intake, when configured.
    pub event_shared_secret: Option<String>,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
    pub redis_required: bool,
}
