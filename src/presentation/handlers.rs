// HTTP request handlers
use crate::domain::error::InvalidInput;
use crate::domain::payload::RawPayload;
use crate::infrastructure::event_stream::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::error::{AppError, AppResult};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "success",
        "samples": state.telemetry.sample_count(),
        "history_capacity": state.telemetry.history_capacity(),
        "fault_state": state.telemetry.fault_state(),
        "subscribers": state.events.subscriber_count(),
    }))
}

/// Latest accepted sample
pub async fn current_data(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    state
        .telemetry
        .current_sample()
        .map(Json)
        .ok_or(AppError::NotFound("No data available"))
}

/// Bounded sample history, oldest first
pub async fn historical_data(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AppResult<Response<Body>> {
    let history = state
        .telemetry
        .historical_samples()
        .ok_or(AppError::NotFound("No historical data available"))?;

    encoded(&history, accepts_brotli(&headers)).await
}

/// Ingest one device sample from the raw request body
pub async fn ingest_data(
    State(state): State<Arc<AppState>>,
    body: String,
) -> AppResult<impl IntoResponse> {
    let sample = state.telemetry.ingest_sample(RawPayload::Text(body))?;
    Ok((StatusCode::CREATED, Json(sample)))
}

/// Active fault, if any
pub async fn current_fault(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    state
        .telemetry
        .current_fault()
        .map(Json)
        .ok_or(AppError::NotFound("No active fault"))
}

/// Fault log, oldest first
pub async fn fault_history(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> AppResult<Response<Body>> {
    let history = state
        .telemetry
        .fault_history()
        .ok_or(AppError::NotFound("No fault history available"))?;

    encoded(&history, accepts_brotli(&headers)).await
}

/// Raise a fault; the `fault` code is mandatory at this boundary
pub async fn raise_fault(
    State(state): State<Arc<AppState>>,
    body: String,
) -> AppResult<impl IntoResponse> {
    let payload: Value = serde_json::from_str(&body)
        .map_err(|e| InvalidInput::MalformedEncoding(e.to_string()))?;
    require_fault_code(&payload)?;

    let record = state
        .telemetry
        .ingest_fault(RawPayload::Structured(payload))?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Resolve the active fault
pub async fn clear_fault(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cleared = state.telemetry.clear_current_fault();
    Json(json!({ "cleared": cleared }))
}

/// Live NDJSON feed of telemetry events
pub async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_receiver(state.events.subscribe())
}

/// Reject fault notifications that do not name the fault.
///
/// Non-object payloads pass through so ingestion reports the shape error.
pub(crate) fn require_fault_code(payload: &Value) -> Result<(), InvalidInput> {
    match payload.as_object().map(|fields| fields.get("fault")) {
        Some(None | Some(Value::Null)) => Err(InvalidInput::MissingField("fault".to_string())),
        _ => Ok(()),
    }
}

async fn encoded<T: Serialize>(data: &T, compress: bool) -> AppResult<Response<Body>> {
    json_response(StatusCode::OK, data, compress)
        .await
        .map_err(|status| AppError::Internal(format!("failed to encode response ({status})")))
}
