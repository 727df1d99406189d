mod common;
mod events;
mod server;

pub use common::{HealthDependencyStatus, HealthResponse};
pub use events::{
    EventAcknowledgementResponse, TaskStateChangeDetailRequest, WorkloadRunningEventRequest,
};
pub use server::{ServerActionResponse, ServerStatusResponse};
