// Application state for HTTP handlers
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::broadcast_notifier::BroadcastNotifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub telemetry: TelemetryService,
    pub events: Arc<BroadcastNotifier>,
}
