//! In-Memory Slot Directory
//!
//! Deterministic directory over a process-local slot table. Backs the
//! invariant tests and dry runs: it enforces the same contract as the
//! PostgreSQL directory and journals every operation that would have
//! reached the server, so tests can assert exactly which round trips a
//! tick issued.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};

use futures_util::future::BoxFuture;

use crate::context::ReconcileContext;
use crate::slots::{
    ReplicationSlot, ReplicationSlotList, ReplicationSlotsConfiguration, SlotError, SlotKind,
    SlotResult,
};

use super::{annotate_and_filter, SlotDirectory};

/// One server round trip the directory performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuedOperation {
    /// Listing of the slot table
    List,
    /// Physical slot creation
    Create {
        /// Slot name
        name: String,
        /// Whether WAL was reserved immediately
        reserve_wal: bool,
    },
    /// Position advancement
    Advance {
        /// Slot name
        name: String,
        /// Target position (textual)
        lsn: String,
    },
    /// Slot removal
    Drop {
        /// Slot name
        name: String,
    },
}

/// Slot directory over an in-process slot table
#[derive(Default)]
pub struct InMemorySlotDirectory {
    state: Mutex<BTreeMap<String, ReplicationSlot>>,
    journal: Mutex<Vec<IssuedOperation>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemorySlotDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an observed slot.
    pub fn insert(&self, slot: ReplicationSlot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.insert(slot.name.clone(), slot);
    }

    /// Flip a seeded slot's active flag, as a WAL sender attaching or
    /// detaching between ticks would.
    pub fn set_active(&self, name: &str, active: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = state.get_mut(name) {
            slot.active = active;
        }
    }

    /// Make every mutation of the named slot fail with a query error.
    pub fn fail_slot(&self, name: &str) {
        self.failing.lock().unwrap_or_else(PoisonError::into_inner).insert(name.to_string());
    }

    /// Stop failing the named slot.
    pub fn heal_slot(&self, name: &str) {
        self.failing.lock().unwrap_or_else(PoisonError::into_inner).remove(name);
    }

    /// Every round trip issued so far, in order.
    pub fn journal(&self) -> Vec<IssuedOperation> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Round trips that mutated the slot table (everything but listings).
    pub fn mutations(&self) -> Vec<IssuedOperation> {
        self.journal()
            .into_iter()
            .filter(|op| !matches!(op, IssuedOperation::List))
            .collect()
    }

    /// Forget the journal, keeping the slot table.
    pub fn clear_journal(&self) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Names currently present in the slot table.
    pub fn slot_names(&self) -> Vec<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Current state of one slot.
    pub fn slot(&self, name: &str) -> Option<ReplicationSlot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    fn record(&self, op: IssuedOperation) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    fn check_reachable(&self, ctx: &ReconcileContext, name: &str) -> SlotResult<()> {
        if ctx.is_cancelled() {
            return Err(SlotError::cancelled(name.to_string()));
        }
        if self.failing.lock().unwrap_or_else(PoisonError::into_inner).contains(name) {
            return Err(SlotError::query(format!("injected failure for {name}")));
        }
        Ok(())
    }
}

impl SlotDirectory for InMemorySlotDirectory {
    fn list<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        config: &'a ReplicationSlotsConfiguration,
    ) -> BoxFuture<'a, SlotResult<ReplicationSlotList>> {
        Box::pin(async move {
            if ctx.is_cancelled() {
                return Err(SlotError::cancelled("list"));
            }
            self.record(IssuedOperation::List);
            let raw: Vec<ReplicationSlot> = self.state.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect();
            annotate_and_filter(raw, config)
        })
    }

    fn create<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            self.check_reachable(ctx, &slot.name)?;
            self.record(IssuedOperation::Create {
                name: slot.name.clone(),
                reserve_wal: slot.restart_lsn.is_some(),
            });

            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.contains_key(&slot.name) {
                return Err(SlotError::AlreadyExists(slot.name.clone()));
            }
            state.insert(
                slot.name.clone(),
                ReplicationSlot {
                    name: slot.name.clone(),
                    kind: SlotKind::Physical,
                    active: false,
                    restart_lsn: slot.restart_lsn,
                    holds_xmin_horizon: false,
                    is_high_availability: slot.is_high_availability,
                },
            );
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            // Nothing to advance to yet; no round trip.
            let Some(target) = slot.restart_lsn else {
                return Ok(());
            };
            self.check_reachable(ctx, &slot.name)?;
            self.record(IssuedOperation::Advance {
                name: slot.name.clone(),
                lsn: target.to_string(),
            });

            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(existing) = state.get_mut(&slot.name) else {
                return Err(SlotError::NotFound(slot.name.clone()));
            };
            // Forward-only, as the server enforces.
            if existing.restart_lsn.map_or(true, |current| current < target) {
                existing.restart_lsn = Some(target);
            }
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            // Refused while active; the engine retries on a later tick.
            if slot.active {
                return Ok(());
            }
            self.check_reachable(ctx, &slot.name)?;
            self.record(IssuedOperation::Drop {
                name: slot.name.clone(),
            });

            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.remove(&slot.name).is_none() {
                return Err(SlotError::NotFound(slot.name.clone()));
            }
            Ok(())
        })
    }
}
