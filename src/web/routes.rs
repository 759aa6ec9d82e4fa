//! HTTP routes

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;
use crate::config::MalformedBodyPolicy;
use crate::db::StatisticRecord;
use crate::stats::{fill_trailing_window, today_utc, TRAILING_DAYS};

/// Liveness check, no auth
pub async fn ping() -> StatusCode {
    StatusCode::OK
}

/// API: Store one answer statistic
pub async fn add_stats(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let record = match serde_json::from_slice::<StatisticRecord>(&body) {
        Ok(record) => record,
        Err(e) => match state.malformed_body {
            MalformedBodyPolicy::AcceptAsZero => {
                tracing::warn!("Undecodable statistic body, storing zero-valued record: {}", e);
                StatisticRecord::default()
            }
            MalformedBodyPolicy::Reject => return Err(ApiError::MalformedBody(e)),
        },
    };

    state.db.insert_record(&record).await?;
    Ok(StatusCode::OK)
}

/// API: Every stored record. Unpaginated, so the response grows with the table.
pub async fn raw_stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let records = state.db.get_all_records().await?;
    json_response(&records)
}

/// API: Record counts per UTC day for today and the 31 days before it
pub async fn count_by_day(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let counts = state.db.count_by_day().await?;
    let series = fill_trailing_window(counts, today_utc(), TRAILING_DAYS);
    json_response(&series)
}

/// Serialize up front so a failure still produces an empty-bodied 500
fn json_response<T: Serialize>(value: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
