use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use ondemand_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Requires `Authorization: Bearer <secret>` on event intake when a secret is configured.
pub async fn require_event_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(secret) = state.event_shared_secret.as_deref()
        && !has_bearer_secret(request.headers(), secret)
    {
        return Err(AppError::Unauthorized("invalid event credentials".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn has_bearer_secret(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| secrets_match(token.as_bytes(), secret.as_bytes()))
}

/// Compares without short-circuiting on the first differing byte.
fn secrets_match(candidate: &[u8], secret: &[u8]) -> bool {
    if candidate.len() != secret.len() {
        return false;
    }

    candidate
        .iter()
        .zip(secret)
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::{has_bearer_secret, secrets_match};

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    #[test]
    fn accepts_matching_bearer_secret() {
        assert!(has_bearer_secret(&headers("Bearer s3cret"), "s3cret"));
    }

    #[test]
    fn rejects_missing_or_mismatched_secret() {
        assert!(!has_bearer_secret(&HeaderMap::new(), "s3cret"));
        assert!(!has_bearer_secret(&headers("Bearer other"), "s3cret"));
        assert!(!has_bearer_secret(&headers("Basic s3cret"), "s3cret"));
    }

    #[test]
    fn rejects_token_with_surrounding_whitespace() {
        assert!(!has_bearer_secret(&headers("Bearer s3cret "), "s3cret"));
        assert!(!has_bearer_secret(&headers("Bearer  s3cret"), "s3cret"));
    }

    #[test]
    fn secret_comparison_requires_equal_length_and_bytes() {
        assert!(secrets_match(b"s3cret", b"s3cret"));
        assert!(!secrets_match(b"s3cre", b"s3cret"));
        assert!(!secrets_match(b"s3creT", b"s3cret"));
        assert!(!secrets_match(b"", b"s3cret"));
    }
}
