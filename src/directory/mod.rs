//! Slot Directory
//!
//! Thin data-access boundary over the target instance. Four operations,
//! each a single round trip, none transactional with each other:
//! - `list` is the single source of truth for slot existence
//! - `create` reserves WAL immediately iff a position is already known
//! - `update` is a no-op without a target position
//! - `delete` is refused as a no-op while the slot is active
//!
//! Every mutation must be individually idempotent across retries: the
//! engine tolerates `create` hitting an existing name and `delete`
//! hitting an already-removed one.

mod memory;
mod postgres;

use futures_util::future::BoxFuture;

pub use memory::{InMemorySlotDirectory, IssuedOperation};
pub use postgres::PostgresSlotDirectory;

use crate::context::ReconcileContext;
use crate::slots::{ReplicationSlot, ReplicationSlotList, ReplicationSlotsConfiguration, SlotResult};

/// Data-access boundary for physical replication slots on one instance.
///
/// Implementations observe the tick's cancellation token: an in-flight
/// call aborts promptly and surfaces the `Cancelled` error kind.
pub trait SlotDirectory: Send + Sync {
    /// List all non-temporary physical slots, annotated with the HA flag
    /// and filtered down to the slots the caller may see.
    fn list<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        config: &'a ReplicationSlotsConfiguration,
    ) -> BoxFuture<'a, SlotResult<ReplicationSlotList>>;

    /// Create a physical slot, reserving WAL iff a position is known.
    fn create<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>>;

    /// Advance the named slot to `slot.restart_lsn`.
    fn update<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>>;

    /// Drop the named slot; refused while it is active.
    fn delete<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>>;
}

/// Annotate raw listing rows with the HA flag and drop the slots the
/// caller is not allowed to manage.
///
/// A non-HA slot matching an exclude pattern is omitted entirely. A
/// pattern that fails to compile aborts the whole listing: configuration
/// errors are global, not per row.
pub(crate) fn annotate_and_filter(
    raw: Vec<ReplicationSlot>,
    config: &ReplicationSlotsConfiguration,
) -> SlotResult<ReplicationSlotList> {
    let mut items = Vec::with_capacity(raw.len());
    for mut slot in raw {
        slot.is_high_availability = config.high_availability.is_ha_slot(&slot.name);
        if !slot.is_high_availability
            && config.synchronize_replicas.is_excluded_by_user(&slot.name)?
        {
            continue;
        }
        items.push(slot);
    }
    Ok(ReplicationSlotList::from(items))
}
