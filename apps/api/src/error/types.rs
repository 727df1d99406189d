use serde::Serialize;
use ts_rs::TS;

/// Error body for routes outside the start/stop envelope.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    /// Stable machine-readable error category, e.g. `not_running`.
    code: &'static str,
    message: String,
}

impl ErrorResponse {
    pub(super) fn new(code: &'static str, message: String) -> Self {
        Self { code, message }
    }
}
