//! Desired-State Calculator
//!
//! Derives the target HA slot set from cluster topology and policy.
//! Pure and deterministic: no I/O, so the reconciliation diff is
//! side-effect-free to compute and only side-effecting to apply.
//! - One desired slot per known standby, named prefix + sanitized identity
//! - HA disabled yields an empty desired set; existing HA slots then
//!   become stale and are dropped by the engine
//! - A standby without a known position yields an entry with no LSN,
//!   which the engine skips until the topology supplies one

use std::collections::BTreeMap;

use crate::slots::{Lsn, ReplicationSlotsConfiguration};

/// Replication status of one known standby instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandbyStatus {
    /// Instance identity as reported by topology discovery
    pub instance_name: String,

    /// Position the primary currently holds for this standby;
    /// `None` until the topology collaborator has observed one
    pub restart_lsn: Option<Lsn>,
}

impl StandbyStatus {
    /// Standby with a known replication position.
    pub fn positioned(instance_name: impl Into<String>, restart_lsn: Lsn) -> Self {
        Self {
            instance_name: instance_name.into(),
            restart_lsn: Some(restart_lsn),
        }
    }

    /// Standby whose position is not yet known.
    pub fn unpositioned(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            restart_lsn: None,
        }
    }
}

/// Known standby instances of one cluster, supplied by the topology
/// collaborator (discovery itself is outside this engine)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterTopology {
    /// Standby instances the primary should retain WAL for
    pub standby_instances: Vec<StandbyStatus>,
}

impl ClusterTopology {
    /// Topology with the given standby statuses.
    pub fn new(standby_instances: Vec<StandbyStatus>) -> Self {
        Self { standby_instances }
    }

    /// Topology with no known standby instances.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Target slot set: slot name to the position it should track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSlots {
    entries: BTreeMap<String, Option<Lsn>>,
}

impl DesiredSlots {
    /// Whether a slot with this name is desired.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Target position for a desired slot.
    pub fn get(&self, name: &str) -> Option<&Option<Lsn>> {
        self.entries.get(name)
    }

    /// Iterate over (name, target position), ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Lsn>)> {
        self.entries.iter()
    }

    /// Number of desired slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no slot is desired.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical slot name for a standby instance.
///
/// PostgreSQL slot names may only contain lower-case letters, digits and
/// underscores, so the hyphens of instance identities become underscores.
pub fn slot_name_for_instance(prefix: &str, instance_name: &str) -> String {
    format!("{}{}", prefix, instance_name.replace('-', "_"))
}

/// Compute the target slot set for a cluster.
pub fn compute_desired(
    topology: &ClusterTopology,
    config: &ReplicationSlotsConfiguration,
) -> DesiredSlots {
    let mut entries = BTreeMap::new();
    if !config.high_availability.enabled {
        return DesiredSlots { entries };
    }

    for standby in &topology.standby_instances {
        let name = slot_name_for_instance(
            &config.high_availability.slot_prefix,
            &standby.instance_name,
        );
        entries.insert(name, standby.restart_lsn);
    }
    DesiredSlots { entries }
}
