// Fault lifecycle state machine with a bounded fault log
use crate::domain::bounded_log::BoundedLog;
use crate::domain::fault::{FaultInput, FaultRecord, FaultState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

pub const MAX_FAULT_LOG_LENGTH: usize = 100;

struct TrackerState {
    log: BoundedLog<FaultRecord>,
    current: Option<FaultRecord>,
}

/// Tracks at most one active fault.
///
/// Raising a fault while another is active replaces the current fault; the
/// earlier one stays unresolved in the log.
pub struct FaultTracker {
    state: RwLock<TrackerState>,
}

impl FaultTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(TrackerState {
                log: BoundedLog::new(capacity),
                current: None,
            }),
        }
    }

    /// Record a new current fault stamped with `clock()`.
    ///
    /// The clock is read inside the write lock so raise times follow log order.
    pub fn raise(&self, input: FaultInput, clock: impl FnOnce() -> DateTime<Utc>) -> FaultRecord {
        let mut state = self.state.write();
        let record = FaultRecord::raised(input, clock());
        state.log.push(record.clone());
        if let Some(orphaned) = state.current.replace(record.clone()) {
            tracing::warn!(
                fault = %orphaned.fault,
                raised_at = %orphaned.timestamp,
                "New fault replaced an unresolved fault"
            );
        }

        record
    }

    /// Resolve the current fault, if any.
    ///
    /// Returns the resolved record, or `None` when no fault was active.
    pub fn clear(&self, now: DateTime<Utc>) -> Option<FaultRecord> {
        let mut state = self.state.write();
        let mut resolved = state.current.take()?;
        resolved.resolve(now);

        // Last-to-first so the most recent entry with this timestamp wins.
        if let Some(entry) = state
            .log
            .iter_mut_rev()
            .find(|entry| entry.timestamp == resolved.timestamp)
        {
            entry.resolved = resolved.resolved;
            entry.resolved_time = resolved.resolved_time;
        }

        Some(resolved)
    }

    pub fn current(&self) -> Option<FaultRecord> {
        self.state.read().current.clone()
    }

    /// Full fault log, oldest first.
    pub fn history(&self) -> Vec<FaultRecord> {
        self.state.read().log.to_vec()
    }

    pub fn state(&self) -> FaultState {
        if self.state.read().current.is_some() {
            FaultState::FaultActive
        } else {
            FaultState::NoFault
        }
    }
}

impl Default for FaultTracker {
    fn default() -> Self {
        Self::new(MAX_FAULT_LOG_LENGTH)
    }
}
