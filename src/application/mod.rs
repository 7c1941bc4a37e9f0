// Application layer - Stores, lifecycle rules and use cases
pub mod change_notifier;
pub mod fault_tracker;
pub mod history_store;
pub mod telemetry_service;
