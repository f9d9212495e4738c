//! Observability Subsystem
//!
//! Structured logging for the reconciliation engine:
//! - Observability is read-only; no side effects on reconciliation
//! - Synchronous output, no background threads
//! - Deterministic field ordering
//!
//! Status reporting, metrics, and retry scheduling belong to the
//! reconciliation scheduler, not to this engine.

mod logger;

pub use logger::{Logger, Severity};
