use std::net::IpAddr;

use async_trait::async_trait;
use ondemand_application::{ComputePlatform, TaskNetworkResolver};
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{TaskHandle, TaskStatus, WorkloadSpec};
use serde::de::DeserializeOwned;

mod wire;

use wire::{
    LaunchTaskRequest, LaunchTaskResponse, NetworkInterfaceResponse, StopTaskRequest,
    TaskDescriptionResponse,
};

/// HTTP adapter for the container platform's task and network APIs.
///
/// Every call is a single request bounded by the client timeout; retries
/// are left to the caller.
#[derive(Clone)]
pub struct HttpComputePlatform {
    http_client: reqwest::Client,
    base_url: reqwest::Url,
    api_token: Option<String>,
}

impl HttpComputePlatform {
    /// Creates a compute platform adapter.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        api_token: Option<String>,
    ) -> AppResult<Self> {
        let base_url = reqwest::Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!(
                "invalid compute platform base url '{base_url}': {error}"
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "compute platform base url '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            api_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation("compute platform base url cannot carry a path".to_owned())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T, String> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|error| format!("{operation} transport error: {error}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(format!("{operation} failed with status {status}: {body}"));
        }

        response
            .json::<T>()
            .await
            .map_err(|error| format!("{operation} returned an invalid body: {error}"))
    }

    async fn describe(
        &self,
        cluster_id: &str,
        task_id: &str,
    ) -> Result<TaskDescriptionResponse, String> {
        let url = self
            .endpoint(&["clusters", cluster_id, "tasks", task_id])
            .map_err(|error| error.to_string())?;
        self.send_json(self.http_client.get(url), "describe task")
            .await
    }
}

#[async_trait]
impl ComputePlatform for HttpComputePlatform {
    async fn launch_task(&self, spec: &WorkloadSpec) -> AppResult<TaskHandle> {
        let url = self.endpoint(&["clusters", spec.cluster_id().as_str(), "tasks"])?;
        let response: LaunchTaskResponse = self
            .send_json(
                self.http_client
                    .post(url)
                    .json(&LaunchTaskRequest::from_spec(spec)),
                "launch task",
            )
            .await
            .map_err(AppError::Internal)?;

        TaskHandle::new(spec.cluster_id().as_str(), response.task_id)
    }

    async fn task_status(&self, task: &TaskHandle) -> AppResult<TaskStatus> {
        self.describe(task.cluster_id(), task.task_id())
            .await
            .map(|description| description.task_status())
            .map_err(AppError::Internal)
    }

    async fn stop_task(&self, task: &TaskHandle, reason: &str) -> AppResult<()> {
        let url = self.endpoint(&[
            "clusters",
            task.cluster_id(),
            "tasks",
            task.task_id(),
            "stop",
        ])?;
        self.send_json::<serde_json::Value>(
            self.http_client.post(url).json(&StopTaskRequest { reason }),
            "stop task",
        )
        .await
        .map(|_| ())
        .map_err(AppError::Internal)
    }
}

#[async_trait]
impl TaskNetworkResolver for HttpComputePlatform {
    async fn describe_task(&self, cluster_id: &str, task_id: &str) -> AppResult<String> {
        self.describe(cluster_id, task_id)
            .await
            .map_err(AppError::PlatformResolutionFailed)?
            .network_interface_id()
            .ok_or_else(|| {
                AppError::PlatformResolutionFailed(format!(
                    "task '{task_id}' has no attached network interface"
                ))
            })
    }

    async fn describe_network_interface(&self, network_interface_id: &str) -> AppResult<IpAddr> {
        let url = self.endpoint(&["network-interfaces", network_interface_id])?;
        let response: NetworkInterfaceResponse = self
            .send_json(self.http_client.get(url), "describe network interface")
            .await
            .map_err(AppError::PlatformResolutionFailed)?;

        response.public_address().map_err(|message| {
            AppError::PlatformResolutionFailed(format!(
                "network interface '{network_interface_id}': {message}"
            ))
        })
    }
}
