//! Reconciliation Subsystem
//!
//! One tick converges one cluster:
//! - Read actual state, compute desired state, diff, apply
//! - Ordering across ticks comes from re-reading fresh state, never
//!   from caching
//! - Idempotent by construction: two ticks over unchanged state issue
//!   zero mutations on the second run

mod engine;
mod errors;
mod plan;

pub use engine::{ReconcileOutcome, SlotReconciler};
pub use errors::{MutationFailure, ReconcileError};
pub use plan::{compute_plan, SlotAction};
