// Fan-out of telemetry events over a tokio broadcast channel
use crate::application::change_notifier::{ChangeNotifier, TelemetryEvent};
use tokio::sync::broadcast;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// In-process publisher for live subscribers (WebSocket and event stream).
///
/// Slow receivers that fall more than `capacity` events behind observe
/// `RecvError::Lagged` and skip ahead; publishing never waits on them.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: TelemetryEvent) {
        let name = event.name();
        // Err only means nobody is listening.
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(event = name, receivers, "Published event"),
            Err(_) => tracing::trace!(event = name, "No subscribers for event"),
        }
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fault::{FaultInput, FaultRecord};
    use chrono::Utc;

    fn fault_event() -> TelemetryEvent {
        TelemetryEvent::FaultRaised(FaultRecord::raised(FaultInput::new("E1", "m"), Utc::now()))
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let notifier = BroadcastNotifier::default();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        let event = fault_event();
        notifier.publish(event.clone());

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let notifier = BroadcastNotifier::default();
        notifier.publish(fault_event());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let notifier = BroadcastNotifier::new(2);
        let mut rx = notifier.subscribe();
        for _ in 0..5 {
            notifier.publish(fault_event());
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }
}
