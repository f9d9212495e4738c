//! slotsync - replication-slot synchronization for PostgreSQL HA clusters
//!
//! Keeps the physical replication slots on a primary instance consistent
//! with the set of known standby instances and operator policy:
//! - Never drop a slot that is still in use
//! - Never move a slot's position backwards
//! - Re-derive everything from live state on every tick, so retries are
//!   safe and convergence is idempotent
//!
//! One reconciliation tick per cluster runs to completion on a single
//! worker; ticks for distinct clusters may run in parallel. The
//! surrounding scheduler owns retry, backoff, and status reporting.

pub mod context;
pub mod directory;
pub mod hooks;
pub mod observability;
pub mod reconcile;
pub mod slots;
pub mod topology;
