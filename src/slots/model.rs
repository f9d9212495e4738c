//! Replication Slot Model
//!
//! Observed state of physical replication slots on the target instance:
//! - Names are unique per instance and immutable once created
//! - Only non-temporary physical slots are ever modelled; logical and
//!   temporary slots are excluded at the query boundary
//! - `active` and `holds_xmin_horizon` are observed, never mutated
//! - `restart_lsn` only moves forward

use serde::{Deserialize, Serialize};

use super::lsn::Lsn;

/// Kind of replication slot this engine manages.
///
/// Only `Physical` exists on purpose: the listing query filters on
/// `slot_type = 'physical'` and nothing else may reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Physical replication slot
    Physical,
}

impl SlotKind {
    /// The `slot_type` value as reported by the instance.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Physical => "physical",
        }
    }
}

/// A physical replication slot as observed on the primary instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSlot {
    /// Unique slot name within the instance
    pub name: String,

    /// Slot kind; always physical for managed slots
    pub kind: SlotKind,

    /// True while a WAL sender is consuming the slot.
    ///
    /// An active slot is never deleted; deletion is deferred to a later
    /// tick once the slot becomes inactive.
    pub active: bool,

    /// Position the slot retains WAL from; `None` until first positioned
    pub restart_lsn: Option<Lsn>,

    /// True when the slot pins a transaction-id horizon that blocks vacuum.
    ///
    /// Informational only: callers use it to reason about retention risk,
    /// the engine never consults it before a mutation.
    pub holds_xmin_horizon: bool,

    /// Derived: true iff the name carries the configured HA prefix
    pub is_high_availability: bool,
}

impl ReplicationSlot {
    /// Build an HA slot the engine intends to create or advance.
    pub fn high_availability(name: impl Into<String>, restart_lsn: Option<Lsn>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Physical,
            active: false,
            restart_lsn,
            holds_xmin_horizon: false,
            is_high_availability: true,
        }
    }

    /// Build a user-owned (non-HA) slot.
    pub fn user(name: impl Into<String>, restart_lsn: Option<Lsn>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Physical,
            active: false,
            restart_lsn,
            holds_xmin_horizon: false,
            is_high_availability: false,
        }
    }

    /// Mark the slot as actively consumed (builder style, used in tests
    /// and by directory implementations assembling observed state).
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Mark the slot as pinning an xmin horizon.
    pub fn with_xmin_horizon(mut self, holds: bool) -> Self {
        self.holds_xmin_horizon = holds;
        self
    }

    /// Textual restart position, empty when not yet positioned.
    pub fn restart_lsn_text(&self) -> String {
        self.restart_lsn
            .map(|lsn| lsn.to_string())
            .unwrap_or_default()
    }

    /// True when the slot is strictly behind the target position.
    pub fn is_behind(&self, target: &Lsn) -> bool {
        match self.restart_lsn {
            None => true,
            Some(current) => current.is_behind(target),
        }
    }
}

/// Ordered collection of observed slots.
///
/// Order is the query result order and carries no meaning; reconciliation
/// is unordered per name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSlotList {
    /// Observed slots
    pub items: Vec<ReplicationSlot>,
}

impl ReplicationSlotList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a slot up by name.
    pub fn get(&self, name: &str) -> Option<&ReplicationSlot> {
        self.items.iter().find(|slot| slot.name == name)
    }

    /// Whether a slot with this name was observed.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of observed slots.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the observed slots.
    pub fn iter(&self) -> impl Iterator<Item = &ReplicationSlot> {
        self.items.iter()
    }
}

impl From<Vec<ReplicationSlot>> for ReplicationSlotList {
    fn from(items: Vec<ReplicationSlot>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let list = ReplicationSlotList::from(vec![
            ReplicationSlot::high_availability("_ha_standby_1", None),
            ReplicationSlot::user("userslot_x", None),
        ]);

        assert!(list.contains("_ha_standby_1"));
        assert!(list.contains("userslot_x"));
        assert!(!list.contains("missing"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_unpositioned_slot_is_behind_any_target() {
        let slot = ReplicationSlot::high_availability("_ha_standby_1", None);
        let target: Lsn = "0/1".parse().unwrap();
        assert!(slot.is_behind(&target));
        assert_eq!(slot.restart_lsn_text(), "");
    }

    #[test]
    fn test_forward_only_comparison() {
        let behind = "16/A0000000".parse().unwrap();
        let ahead: Lsn = "16/B374D848".parse().unwrap();
        let slot = ReplicationSlot::high_availability("_ha_standby_1", Some(ahead));

        // At or ahead of the target means nothing to advance to.
        assert!(!slot.is_behind(&ahead));
        assert!(!slot.is_behind(&behind));
    }
}
