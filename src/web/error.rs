//! HTTP error type
//!
//! Failures are reported through the status code alone; the response body is
//! always empty.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid auth token")]
    Unauthorized,

    #[error("request body is not a statistic record: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Store(_) | Self::Serialize(_) => tracing::error!("Error: {:#}", self),
            Self::MalformedBody(_) => tracing::warn!("Rejected request: {}", self),
            Self::Unauthorized => {}
        }
        status.into_response()
    }
}
