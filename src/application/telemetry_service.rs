// Telemetry service - Ingestion use cases and read access to the stores
use crate::application::change_notifier::{ChangeNotifier, TelemetryEvent};
use crate::application::fault_tracker::FaultTracker;
use crate::application::history_store::HistoryStore;
use crate::domain::error::InvalidInput;
use crate::domain::fault::{FaultInput, FaultRecord, FaultState};
use crate::domain::payload::RawPayload;
use crate::domain::sample::{normalize, Sample, SampleKeys};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct TelemetryService {
    history: Arc<HistoryStore>,
    faults: Arc<FaultTracker>,
    notifier: Arc<dyn ChangeNotifier>,
    keys: SampleKeys,
}

impl TelemetryService {
    pub fn new(
        history: Arc<HistoryStore>,
        faults: Arc<FaultTracker>,
        notifier: Arc<dyn ChangeNotifier>,
        keys: SampleKeys,
    ) -> Self {
        Self {
            history,
            faults,
            notifier,
            keys,
        }
    }

    /// Normalize and store a device sample, then announce it.
    ///
    /// Input is fully validated before the history store is touched.
    pub fn ingest_sample(&self, raw: RawPayload) -> Result<Sample, InvalidInput> {
        let sample = normalize(raw, &self.keys, Utc::now()).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected telemetry sample");
        })?;

        let sample = self.history.append_stamped(sample, Utc::now);
        tracing::debug!(
            voltage = sample.voltage(),
            current = sample.current(),
            power = sample.power(),
            "Accepted telemetry sample"
        );

        self.notifier
            .publish(TelemetryEvent::SampleAccepted(sample.clone()));
        Ok(sample)
    }

    pub fn current_sample(&self) -> Option<Sample> {
        self.history.current()
    }

    /// `None` until the first sample arrives.
    pub fn historical_samples(&self) -> Option<Vec<Sample>> {
        let history = self.history.history();
        (!history.is_empty()).then_some(history)
    }

    pub fn ingest_fault(&self, raw: RawPayload) -> Result<FaultRecord, InvalidInput> {
        let input = FaultInput::from_payload(raw).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected fault notification");
        })?;

        let record = self.faults.raise(input, Utc::now);
        tracing::info!(fault = %record.fault, message = %record.message, "Fault raised");

        self.notifier
            .publish(TelemetryEvent::FaultRaised(record.clone()));
        Ok(record)
    }

    /// Resolve the active fault. Returns `false` when there was nothing to clear.
    pub fn clear_current_fault(&self) -> bool {
        match self.faults.clear(Utc::now()) {
            Some(record) => {
                tracing::info!(fault = %record.fault, "Fault cleared");
                self.notifier.publish(TelemetryEvent::FaultCleared(record));
                true
            }
            None => {
                tracing::debug!("Clear requested with no active fault");
                false
            }
        }
    }

    pub fn current_fault(&self) -> Option<FaultRecord> {
        self.faults.current()
    }

    /// `None` until the first fault is raised.
    pub fn fault_history(&self) -> Option<Vec<FaultRecord>> {
        let history = self.faults.history();
        (!history.is_empty()).then_some(history)
    }

    pub fn fault_state(&self) -> FaultState {
        self.faults.state()
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::KeyConvention;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl ChangeNotifier for RecordingNotifier {
        fn publish(&self, event: TelemetryEvent) {
            self.events.lock().push(event);
        }
    }

    fn service_with(capacity: usize) -> (TelemetryService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = TelemetryService::new(
            Arc::new(HistoryStore::new(capacity)),
            Arc::new(FaultTracker::default()),
            notifier.clone(),
            KeyConvention::Full.into(),
        );
        (service, notifier)
    }

    fn reading(v: f64) -> RawPayload {
        RawPayload::Structured(json!({"voltage": v, "current": 2.5, "angle": 30.0}))
    }

    #[test]
    fn test_nothing_is_available_before_ingestion() {
        let (service, _) = service_with(10);

        assert!(service.current_sample().is_none());
        assert!(service.historical_samples().is_none());
        assert!(service.current_fault().is_none());
        assert!(service.fault_history().is_none());
    }

    #[test]
    fn test_ingest_sample_stores_and_announces() {
        let (service, notifier) = service_with(10);
        let sample = service.ingest_sample(reading(12.0)).unwrap();

        assert_eq!(sample.power(), 30.0);
        assert_eq!(service.current_sample(), Some(sample.clone()));
        assert_eq!(service.historical_samples(), Some(vec![sample.clone()]));
        assert_eq!(
            *notifier.events.lock(),
            vec![TelemetryEvent::SampleAccepted(sample)]
        );
    }

    #[test]
    fn test_rejected_sample_changes_nothing() {
        let (service, notifier) = service_with(10);
        let first = service.ingest_sample(reading(1.0)).unwrap();

        let err = service
            .ingest_sample(RawPayload::Text("{not valid json".into()))
            .unwrap_err();
        assert!(matches!(err, InvalidInput::MalformedEncoding(_)));

        let err = service
            .ingest_sample(RawPayload::Structured(
                json!({"voltage": "high", "current": 1, "angle": 0}),
            ))
            .unwrap_err();
        assert!(matches!(err, InvalidInput::NonNumeric { .. }));

        assert_eq!(service.current_sample(), Some(first.clone()));
        assert_eq!(service.historical_samples(), Some(vec![first]));
        assert_eq!(notifier.events.lock().len(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let (service, _) = service_with(5);
        let mut last = None;
        for i in 0..12 {
            last = Some(service.ingest_sample(reading(i as f64)).unwrap());
        }

        let history = service.historical_samples().unwrap();
        let voltages: Vec<f64> = history.iter().map(|s| s.voltage()).collect();
        assert_eq!(voltages, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(service.current_sample(), last);
    }

    #[test]
    fn test_fault_round_trip() {
        let (service, notifier) = service_with(10);
        let raised = service
            .ingest_fault(RawPayload::Structured(
                json!({"fault": "OVERVOLT", "message": "too high"}),
            ))
            .unwrap();
        assert_eq!(service.fault_state(), FaultState::FaultActive);
        assert_eq!(service.current_fault(), Some(raised.clone()));

        assert!(service.clear_current_fault());

        let history = service.fault_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].fault, "OVERVOLT");
        assert_eq!(history[0].message, "too high");
        assert!(history[0].resolved);
        assert!(history[0].resolved_time.is_some());
        assert!(service.current_fault().is_none());

        let names: Vec<&str> = notifier.events.lock().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["fault_raised", "fault_cleared"]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (service, notifier) = service_with(10);
        service
            .ingest_fault(RawPayload::Structured(json!({"fault": "E1", "message": "x"})))
            .unwrap();

        assert!(service.clear_current_fault());
        let before = service.fault_history();

        assert!(!service.clear_current_fault());
        assert_eq!(service.fault_history(), before);
        assert_eq!(notifier.events.lock().len(), 2);
    }

    #[test]
    fn test_clear_without_fault_returns_false() {
        let (service, notifier) = service_with(10);

        assert!(!service.clear_current_fault());
        assert!(service.fault_history().is_none());
        assert!(notifier.events.lock().is_empty());
    }

    #[test]
    fn test_rejected_fault_changes_nothing() {
        let (service, _) = service_with(10);
        let err = service
            .ingest_fault(RawPayload::Text("[\"fault\"]".into()))
            .unwrap_err();

        assert_eq!(err, InvalidInput::NotAnObject("array"));
        assert!(service.fault_history().is_none());
        assert_eq!(service.fault_state(), FaultState::NoFault);
    }

    #[test]
    fn test_concurrent_ingestion_applies_every_sample() {
        let (service, notifier) = service_with(1000);
        let threads = 8;
        let per_thread = 200;

        std::thread::scope(|scope| {
            for t in 0..threads {
                let service = service.clone();
                scope.spawn(move || {
                    for i in 0..per_thread {
                        service
                            .ingest_sample(reading((t * per_thread + i) as f64))
                            .unwrap();
                    }
                });
            }
        });

        let total = threads * per_thread;
        let history = service.historical_samples().unwrap();
        assert_eq!(history.len(), total.min(1000));
        assert_eq!(notifier.events.lock().len(), total);
        assert!(history.iter().all(|s| s.power() == s.voltage() * s.current()));
        assert_eq!(service.current_sample().as_ref(), history.last());
        assert!(history
            .windows(2)
            .all(|w| w[0].timestamp() <= w[1].timestamp()));
    }

    #[test]
    fn test_concurrent_faults_are_logged_in_timestamp_order() {
        let (service, _) = service_with(10);

        std::thread::scope(|scope| {
            for t in 0..4 {
                let service = service.clone();
                scope.spawn(move || {
                    for i in 0..20 {
                        let code = format!("E{}-{}", t, i);
                        service
                            .ingest_fault(RawPayload::Structured(json!({ "fault": code })))
                            .unwrap();
                    }
                });
            }
        });

        let history = service.fault_history().unwrap();
        assert_eq!(history.len(), 80);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(service.current_fault().as_ref(), history.last());
    }

    #[test]
    fn test_concurrent_ingestion_below_capacity() {
        let (service, _) = service_with(1000);

        std::thread::scope(|scope| {
            for t in 0..4 {
                let service = service.clone();
                scope.spawn(move || {
                    for i in 0..100 {
                        service.ingest_sample(reading((t * 100 + i) as f64)).unwrap();
                    }
                });
            }
        });

        let mut voltages: Vec<f64> = service
            .historical_samples()
            .unwrap()
            .iter()
            .map(|s| s.voltage())
            .collect();
        voltages.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..400).map(|v| v as f64).collect();
        assert_eq!(voltages, expected);
    }
}
