use ondemand_core::AppResult;
use ondemand_domain::{DnsRecord, WorkloadRunningEvent};

use super::types::{EventAcknowledgementResponse, WorkloadRunningEventRequest};

const RUNNING_TASK_STATUS: &str = "RUNNING";

impl WorkloadRunningEventRequest {
    /// Returns the running event, or `None` for a state change that is not a running transition.
    pub fn into_running_event(self) -> AppResult<Option<WorkloadRunningEvent>> {
        match self {
            Self::Flat {
                cluster_id,
                task_id,
            } => WorkloadRunningEvent::new(cluster_id, task_id).map(Some),
            Self::StateChange { detail } => {
                if detail
                    .last_status
                    .as_deref()
                    .is_some_and(|status| !status.eq_ignore_ascii_case(RUNNING_TASK_STATUS))
                {
                    return Ok(None);
                }

                WorkloadRunningEvent::new(detail.cluster_arn, detail.task_arn).map(Some)
            }
        }
    }
}

impl EventAcknowledgementResponse {
    pub fn ignored() -> Self {
        Self {
            status: "ignored",
            record_name: None,
            address: None,
            ttl_seconds: None,
        }
    }
}

impl From<DnsRecord> for EventAcknowledgementResponse {
    fn from(value: DnsRecord) -> Self {
        Self {
            status: "published",
            record_name: Some(value.name().to_owned()),
            address: Some(value.address().to_string()),
            ttl_seconds: Some(value.ttl_seconds()),
        }
    }
}
