use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use ondemand_core::AppError;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Builds the CORS layer; any origin is allowed when none is configured.
pub(super) fn build_cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer, AppError> {
    let allow_origin = match allowed_origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin).map_err(|error| {
            AppError::Validation(format!("invalid CORS_ALLOWED_ORIGIN: {error}"))
        })?),
        None => AllowOrigin::any(),
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}
