// Bounded sample history with a current-sample slot
use crate::domain::bounded_log::BoundedLog;
use crate::domain::sample::Sample;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

pub const MAX_HISTORY_LENGTH: usize = 1000;

struct HistoryState {
    window: BoundedLog<Sample>,
    current: Option<Sample>,
}

impl HistoryState {
    fn commit(&mut self, sample: Sample) {
        let evicted = self.window.push(sample.clone());
        self.current = Some(sample);

        if evicted > 0 {
            tracing::trace!(evicted, "History window full, dropped oldest samples");
        }
    }
}

/// Shared store for the most recent samples.
///
/// The window and the current slot live behind one lock so readers never see
/// one updated without the other.
pub struct HistoryStore {
    state: RwLock<HistoryState>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(HistoryState {
                window: BoundedLog::new(capacity),
                current: None,
            }),
        }
    }

    pub fn append(&self, sample: Sample) {
        let mut state = self.state.write();
        state.commit(sample);
    }

    /// Append `sample` re-stamped with `clock()` read inside the write lock,
    /// so timestamps never decrease along the window.
    pub fn append_stamped(&self, sample: Sample, clock: impl FnOnce() -> DateTime<Utc>) -> Sample {
        let mut state = self.state.write();
        let sample = sample.stamped(clock());
        state.commit(sample.clone());
        sample
    }

    pub fn current(&self) -> Option<Sample> {
        self.state.read().current.clone()
    }

    /// Full window, oldest first.
    pub fn history(&self) -> Vec<Sample> {
        self.state.read().window.to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.read().window.len()
    }

    pub fn capacity(&self) -> usize {
        self.state.read().window.capacity()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(MAX_HISTORY_LENGTH)
    }
}
