// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::application::fault_tracker::FaultTracker;
use crate::application::history_store::HistoryStore;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::broadcast_notifier::BroadcastNotifier;
use crate::infrastructure::config::load_settings;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create stores and notifier (application + infrastructure layers)
    let history = Arc::new(HistoryStore::new(settings.telemetry.history_capacity));
    let faults = Arc::new(FaultTracker::new(settings.telemetry.fault_capacity));
    let events = Arc::new(BroadcastNotifier::new(settings.events.channel_capacity));

    let telemetry = TelemetryService::new(
        history,
        faults,
        events.clone(),
        settings.telemetry.key_convention.into(),
    );

    // Create application state
    let state = Arc::new(AppState { telemetry, events });

    // Build router (presentation layer)
    let router = build_router(state, &settings.server.cors_origins)?;

    // Start server
    let addr = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        history_capacity = settings.telemetry.history_capacity,
        fault_capacity = settings.telemetry.fault_capacity,
        key_convention = ?settings.telemetry.key_convention,
        "Starting device-telemetry service"
    );

    axum::serve(listener, router).await?;

    Ok(())
}
