use axum::http::StatusCode;
use chrono::SecondsFormat;
use ondemand_application::{ServerStatusView, StartServerOutcome, StopServerOutcome};
use ondemand_core::AppError;
use ondemand_domain::{ExecutionReference, ServerStatus};

use super::types::{ServerActionResponse, ServerStatusResponse};

impl ServerActionResponse {
    fn accepted(status_code: StatusCode, server_status: ServerStatus) -> Self {
        Self {
            status_code: status_code.as_u16(),
            success: true,
            server_status: Some(server_status.as_str()),
            error: None,
        }
    }

    /// Maps a start outcome: 200 STARTING when acquired, 409 ONLINE otherwise.
    pub fn from_start(outcome: &StartServerOutcome) -> Self {
        match outcome {
            StartServerOutcome::Starting { .. } => {
                Self::accepted(StatusCode::OK, outcome.server_status())
            }
            StartServerOutcome::AlreadyActive { .. } => {
                Self::accepted(StatusCode::CONFLICT, outcome.server_status())
            }
        }
    }

    pub fn from_stop(_outcome: &StopServerOutcome) -> Self {
        Self::accepted(StatusCode::OK, ServerStatus::Stopping)
    }

    /// Maps a failed start or stop. Only `NotRunning` keeps a server status.
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::NotRunning => Self {
                status_code: StatusCode::NOT_FOUND.as_u16(),
                success: false,
                server_status: Some(ServerStatus::Offline.as_str()),
                error: Some(error.to_string()),
            },
            _ => Self {
                status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                success: false,
                server_status: None,
                error: Some(error.to_string()),
            },
        }
    }

    /// Returns the HTTP status carried in the envelope.
    pub fn http_status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ServerStatusView> for ServerStatusResponse {
    fn from(value: ServerStatusView) -> Self {
        Self {
            server_status: value.status.as_str(),
            execution_reference: value
                .execution_reference
                .as_ref()
                .map(ExecutionReference::to_string),
            updated_at: value
                .updated_at
                .map(|updated_at| updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}
