use serde::Serialize;
use ts_rs::TS;

/// Envelope returned by start and stop for every outcome.
///
/// `server_status` is omitted on failures other than a stop without an active run.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/server-action-response.ts"
)]
pub struct ServerActionResponse {
    pub status_code: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub server_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

/// Current lock state.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/server-status-response.ts"
)]
pub struct ServerStatusResponse {
    pub server_status: &'static str,
    pub execution_reference: Option<String>,
    /// RFC 3339 timestamp of the last lock write.
    pub updated_at: Option<String>,
}
