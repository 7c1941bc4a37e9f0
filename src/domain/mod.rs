// Domain layer - Records, normalization and validation rules
pub mod bounded_log;
pub mod error;
pub mod fault;
pub mod payload;
pub mod sample;
