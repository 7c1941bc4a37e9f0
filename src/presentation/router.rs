// Router assembly and middleware
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_fault, current_data, current_fault, fault_history, health_check, historical_data,
    ingest_data, raise_fault, stream_events,
};
use crate::presentation::ws::ws_handler;
use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> anyhow::Result<Router> {
    let cors = build_cors_layer(cors_origins)?;

    Ok(Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/data", post(ingest_data))
        .route("/data/current", get(current_data))
        .route("/data/historical", get(historical_data))
        .route("/faults", post(raise_fault))
        .route("/faults/current", get(current_fault))
        .route("/faults/history", get(fault_history))
        .route("/faults/clear", post(clear_fault))
        .route("/events", get(stream_events))
        .route("/ws", get(ws_handler))
}

fn build_cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{}'", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}
