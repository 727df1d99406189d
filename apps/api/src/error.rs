use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ondemand_core::AppError;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Returns the HTTP status for the wrapped error category.
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotRunning => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PlatformResolutionFailed(_) | AppError::NamingUpdateFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::WorkflowSubmissionFailed(_)
            | AppError::WorkflowTerminationFailed(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable error code rendered in the response body.
    pub fn code(&self) -> &'static str {
        match self.0 {
            AppError::Validation(_) => "validation",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotRunning => "not_running",
            AppError::Conflict(_) => "conflict",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::WorkflowSubmissionFailed(_) => "workflow_submission_failed",
            AppError::WorkflowTerminationFailed(_) => "workflow_termination_failed",
            AppError::PlatformResolutionFailed(_) => "platform_resolution_failed",
            AppError::NamingUpdateFailed(_) => "naming_update_failed",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = Json(ErrorResponse::new(self.code(), self.0.to_string()));

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
