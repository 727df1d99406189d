use std::net::IpAddr;

use ondemand_domain::{TaskStatus, WorkloadSpec};
use serde::{Deserialize, Serialize};
use tracing::warn;

const NETWORK_INTERFACE_DETAIL: &str = "networkInterfaceId";

#[derive(Debug, Serialize)]
pub(super) struct LaunchTaskRequest<'a> {
    task_definition: &'a str,
    container_name: &'a str,
    subnets: &'a [String],
    security_groups: &'a [String],
    assign_public_ip: bool,
    environment: Vec<EnvironmentVariable<'a>>,
}

#[derive(Debug, Serialize)]
struct EnvironmentVariable<'a> {
    name: &'a str,
    value: &'a str,
}

impl<'a> LaunchTaskRequest<'a> {
    pub(super) fn from_spec(spec: &'a WorkloadSpec) -> Self {
        Self {
            task_definition: spec.task_definition().as_str(),
            container_name: spec.container_name().as_str(),
            subnets: spec.subnets(),
            security_groups: spec.security_groups(),
            assign_public_ip: spec.assign_public_ip(),
            environment: spec
                .environment()
                .iter()
                .map(|(name, value)| EnvironmentVariable { name, value })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LaunchTaskResponse {
    pub(super) task_id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct StopTaskRequest<'a> {
    pub(super) reason: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct TaskDescriptionResponse {
    last_status: String,
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    stopped_reason: Option<String>,
    #[serde(default)]
    attachments: Vec<TaskAttachment>,
}

#[derive(Debug, Deserialize)]
struct TaskAttachment {
    #[serde(default)]
    details: Vec<AttachmentDetail>,
}

#[derive(Debug, Deserialize)]
struct AttachmentDetail {
    name: String,
    value: String,
}

impl TaskDescriptionResponse {
    pub(super) fn task_status(&self) -> TaskStatus {
        match self.last_status.to_ascii_uppercase().as_str() {
            "PROVISIONING" | "PENDING" | "ACTIVATING" => TaskStatus::Provisioning,
            "RUNNING" | "DEACTIVATING" | "STOPPING" | "DEPROVISIONING" => TaskStatus::Running,
            "STOPPED" => TaskStatus::Stopped {
                exit_code: self.exit_code,
                reason: self.stopped_reason.clone(),
            },
            other => {
                warn!(last_status = other, "unknown task status; treating as provisioning");
                TaskStatus::Provisioning
            }
        }
    }

    pub(super) fn network_interface_id(&self) -> Option<String> {
        self.attachments
            .iter()
            .flat_map(|attachment| attachment.details.iter())
            .find(|detail| detail.name == NETWORK_INTERFACE_DETAIL)
            .map(|detail| detail.value.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NetworkInterfaceResponse {
    #[serde(default)]
    association: Option<NetworkInterfaceAssociation>,
}

#[derive(Debug, Deserialize)]
struct NetworkInterfaceAssociation {
    #[serde(default)]
    public_ip: Option<String>,
}

impl NetworkInterfaceResponse {
    pub(super) fn public_address(&self) -> Result<IpAddr, String> {
        let public_ip = self
            .association
            .as_ref()
            .and_then(|association| association.public_ip.as_deref())
            .ok_or_else(|| "no public address is associated".to_owned())?;

        public_ip
            .parse::<IpAddr>()
            .map_err(|error| format!("invalid public address '{public_ip}': {error}"))
    }
}
