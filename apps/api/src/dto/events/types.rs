use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming "workload running" notification.
///
/// Accepts the flat form or a platform task state-change envelope.
#[derive(Debug, Deserialize, TS)]
#[serde(untagged)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/workload-running-event-request.ts"
)]
pub enum WorkloadRunningEventRequest {
    Flat {
        cluster_id: String,
        task_id: String,
    },
    StateChange {
        detail: TaskStateChangeDetailRequest,
    },
}

/// Detail block of a task state-change envelope.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/task-state-change-detail-request.ts"
)]
pub struct TaskStateChangeDetailRequest {
    pub cluster_arn: String,
    pub task_arn: String,
    #[serde(default)]
    pub last_status: Option<String>,
}

/// Acknowledgement for one processed event.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/event-acknowledgement-response.ts"
)]
pub struct EventAcknowledgementResponse {
    /// `published` or `ignored`.
    pub status: &'static str,
    pub record_name: Option<String>,
    pub address: Option<String>,
    pub ttl_seconds: Option<u32>,
}
