//! Application services and ports.

#![forbid(unsafe_code)]

mod cleanup_handler;
mod endpoint_publisher;
mod lifecycle_ports;
mod lifecycle_service;
mod platform_ports;
mod workflow_ports;
mod workflow_runner;

#[cfg(test)]
mod test_support;

pub use cleanup_handler::{CleanupHandler, CleanupOutcome};
pub use endpoint_publisher::EndpointPublisher;
pub use lifecycle_ports::{LockStore, WorkflowEngine};
pub use lifecycle_service::{
    LifecycleService, ServerStatusView, StartServerOutcome, StopServerOutcome,
};
pub use platform_ports::{ComputePlatform, NamingService, TaskNetworkResolver};
pub use workflow_ports::{
    ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowRun, WorkflowRunRepository,
};
pub use workflow_runner::{WorkflowRunner, WorkflowRunnerConfig};
