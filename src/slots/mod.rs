//! Replication Slot Subsystem
//!
//! Data model and policy for physical replication slots:
//! - Slot names are unique per instance; the directory is the single
//!   source of truth for existence
//! - A slot is HA-managed iff its name carries the configured prefix;
//!   HA slots are never subject to user exclusion filtering
//! - An active slot is never deleted; deletion is deferred
//! - `restart_lsn` only moves forward

mod classify;
mod config;
mod errors;
mod lsn;
mod model;

pub use classify::{classify, SlotClass};
pub use config::{
    HighAvailabilityConfig, ReplicationSlotsConfiguration, SynchronizeReplicasConfig,
    DEFAULT_SLOT_PREFIX,
};
pub use errors::{SlotError, SlotResult};
pub use lsn::{parse_optional_lsn, Lsn, ParseLsnError};
pub use model::{ReplicationSlot, ReplicationSlotList, SlotKind};
