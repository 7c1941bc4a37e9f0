// Notification seam for accepted mutations
use crate::domain::fault::FaultRecord;
use crate::domain::sample::Sample;
use serde::Serialize;

/// A state change the core reports to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum TelemetryEvent {
    #[serde(rename = "data_update")]
    SampleAccepted(Sample),
    #[serde(rename = "fault_raised")]
    FaultRaised(FaultRecord),
    #[serde(rename = "fault_cleared")]
    FaultCleared(FaultRecord),
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::SampleAccepted(_) => "data_update",
            TelemetryEvent::FaultRaised(_) => "fault_raised",
            TelemetryEvent::FaultCleared(_) => "fault_cleared",
        }
    }
}

/// Receives events after a mutation has been committed.
///
/// Called outside every store lock; implementations must not block.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: TelemetryEvent);
}
