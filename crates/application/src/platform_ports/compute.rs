use std::net::IpAddr;

use async_trait::async_trait;
use ondemand_core::AppResult;
use ondemand_domain::{TaskHandle, TaskStatus, WorkloadSpec};

/// Compute platform operations used by the RunWorkload step.
#[async_trait]
pub trait ComputePlatform: Send + Sync {
    /// Launches one workload task.
    async fn launch_task(&self, spec: &WorkloadSpec) -> AppResult<TaskHandle>;

    /// Returns the current platform state of a task.
    async fn task_status(&self, task: &TaskHandle) -> AppResult<TaskStatus>;

    /// Requests the platform to stop a task.
    async fn stop_task(&self, task: &TaskHandle, reason: &str) -> AppResult<()>;
}

/// Address lookups used by the endpoint publisher.
#[async_trait]
pub trait TaskNetworkResolver: Send + Sync {
    /// Returns the network interface attached to a task.
    async fn describe_task(&self, cluster_id: &str, task_id: &str) -> AppResult<String>;

    /// Returns the public address associated with a network interface.
    async fn describe_network_interface(&self, network_interface_id: &str) -> AppResult<IpAddr>;
}
