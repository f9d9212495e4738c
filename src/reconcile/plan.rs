//! Reconciliation Plan
//!
//! Pure diff of actual against desired slot state. Decision table per
//! observed or desired name:
//! - desired, missing, position known      -> create at that position
//! - desired, present, strictly behind     -> advance (forward-only)
//! - desired, position unknown             -> skip until the topology
//!                                            supplies one
//! - present, HA, no longer desired        -> drop; deferred while active
//! - present, non-HA, excluded by policy   -> drop; deferred while active
//! - present, non-HA, included or ignored  -> leave untouched
//!
//! Computing the plan has no side effects; only applying it does.

use crate::hooks::PlannedOperation;
use crate::slots::{
    classify, ReplicationSlot, ReplicationSlotList, ReplicationSlotsConfiguration, SlotClass,
    SlotResult,
};
use crate::topology::DesiredSlots;

/// One mutation the engine intends to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAction {
    /// Create a missing desired slot at the given position
    Create(ReplicationSlot),

    /// Advance an existing slot; `restart_lsn` carries the target
    Update(ReplicationSlot),

    /// Drop a stale HA slot or a newly excluded user slot
    Delete(ReplicationSlot),
}

impl SlotAction {
    /// The slot this action targets.
    pub fn slot(&self) -> &ReplicationSlot {
        match self {
            SlotAction::Create(slot) | SlotAction::Update(slot) | SlotAction::Delete(slot) => slot,
        }
    }

    /// The target slot name.
    pub fn slot_name(&self) -> &str {
        &self.slot().name
    }

    /// The operation kind, as carried into hooks and failure reports.
    pub fn operation(&self) -> PlannedOperation {
        match self {
            SlotAction::Create(_) => PlannedOperation::Create,
            SlotAction::Update(_) => PlannedOperation::Update,
            SlotAction::Delete(_) => PlannedOperation::Delete,
        }
    }
}

/// Diff actual against desired state into an ordered list of mutations.
///
/// Creates and updates come out in desired-name order, deletes in the
/// observed listing order; ordering carries no semantics and exists only
/// to keep ticks deterministic for a given input.
pub fn compute_plan(
    actual: &ReplicationSlotList,
    desired: &DesiredSlots,
    config: &ReplicationSlotsConfiguration,
) -> SlotResult<Vec<SlotAction>> {
    let mut plan = Vec::new();

    for (name, target) in desired.iter() {
        // Position not yet known: nothing to create or advance to.
        let Some(target) = target else {
            continue;
        };
        match actual.get(name) {
            None => {
                plan.push(SlotAction::Create(ReplicationSlot::high_availability(
                    name.clone(),
                    Some(*target),
                )));
            }
            Some(observed) if observed.is_behind(target) => {
                let mut advanced = observed.clone();
                advanced.restart_lsn = Some(*target);
                plan.push(SlotAction::Update(advanced));
            }
            // Already at or ahead of the target: forward-only no-op.
            Some(_) => {}
        }
    }

    for observed in actual.iter() {
        if desired.contains(&observed.name) {
            continue;
        }
        let class = classify(&observed.name, config)?;
        let stale = match class {
            SlotClass::ManagedHa => true,
            SlotClass::Excluded => true,
            SlotClass::ManagedUser | SlotClass::Unmanaged => false,
        };
        // An active slot blocks deletion, not updates; deletion is
        // deferred until a later tick observes it inactive.
        if stale && !observed.active {
            plan.push(SlotAction::Delete(observed.clone()));
        }
    }

    Ok(plan)
}
