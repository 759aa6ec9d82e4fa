//! Shared-secret access gate for the `/stats` routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::AppState;

pub const AUTH_HEADER: &str = "x-auth-token";

/// Reject the request unless `X-Auth-Token` equals the configured secret.
/// Only the first header value is considered.
pub async fn require_auth_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let supplied = request.headers().get(AUTH_HEADER).map(|v| v.as_bytes());

    if !token_matches(state.auth_token.as_bytes(), supplied) {
        tracing::warn!(
            "Unauthorized {} {} (auth header {})",
            request.method(),
            request.uri().path(),
            if supplied.is_some() { "mismatch" } else { "absent" }
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Byte-for-byte comparison, constant time for equal lengths
fn token_matches(expected: &[u8], supplied: Option<&[u8]>) -> bool {
    match supplied {
        Some(token) if token.len() == expected.len() => token.ct_eq(expected).into(),
        _ => false,
    }
}
