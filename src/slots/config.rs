//! Replication Slot Policy Configuration
//!
//! Read-only policy sourced from the cluster's declared spec:
//! - The HA prefix names the slots that mirror known standby instances
//! - Exclude patterns restrict which non-HA slots the engine may manage
//! - A pattern that fails to compile is a configuration error for the
//!   whole tick, never a per-slot error

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{SlotError, SlotResult};

/// Default prefix for slots that mirror known standby instances
pub const DEFAULT_SLOT_PREFIX: &str = "_ha_";

/// High-availability slot policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighAvailabilityConfig {
    /// Whether HA slots are synchronized at all
    pub enabled: bool,

    /// Prefix naming the HA slot for each known standby instance
    pub slot_prefix: String,
}

impl Default for HighAvailabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slot_prefix: DEFAULT_SLOT_PREFIX.to_string(),
        }
    }
}

impl HighAvailabilityConfig {
    /// True iff this name carries the HA prefix.
    ///
    /// Derived from the name alone; the enabled flag decides whether HA
    /// slots are synchronized, not whether a slot counts as HA.
    pub fn is_ha_slot(&self, name: &str) -> bool {
        !self.slot_prefix.is_empty() && name.starts_with(&self.slot_prefix)
    }
}

/// User slot synchronization policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynchronizeReplicasConfig {
    /// Whether non-HA slots are managed at all
    pub enabled: bool,

    /// Patterns (anchored regular expressions) naming the non-HA slots the
    /// engine must leave alone
    pub exclude_patterns: Vec<String>,
}

impl Default for SynchronizeReplicasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_patterns: Vec::new(),
        }
    }
}

impl SynchronizeReplicasConfig {
    /// Whether a non-HA slot name matches any exclude pattern.
    ///
    /// A pattern that does not compile aborts the evaluation with a
    /// configuration error; it cannot be retried away and must surface
    /// globally rather than be swallowed per slot.
    pub fn is_excluded_by_user(&self, name: &str) -> SlotResult<bool> {
        for pattern in &self.exclude_patterns {
            let regex = Regex::new(pattern).map_err(|e| {
                SlotError::configuration(format!("exclude pattern {pattern:?}: {e}"))
            })?;
            if regex.is_match(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compile every exclude pattern, surfacing the first failure.
    pub fn compile_exclude_patterns(&self) -> SlotResult<Vec<Regex>> {
        self.exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SlotError::configuration(format!("exclude pattern {pattern:?}: {e}"))
                })
            })
            .collect()
    }
}

/// Replication slot policy for one cluster, read-only to the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplicationSlotsConfiguration {
    /// HA slot policy
    pub high_availability: HighAvailabilityConfig,

    /// User slot policy
    pub synchronize_replicas: SynchronizeReplicasConfig,
}

impl ReplicationSlotsConfiguration {
    /// Validate the policy before any tick uses it.
    ///
    /// - HA synchronization requires a non-empty prefix, otherwise every
    ///   slot on the instance would classify as HA-managed
    /// - Every exclude pattern must compile
    pub fn validate(&self) -> SlotResult<()> {
        if self.high_availability.enabled && self.high_availability.slot_prefix.is_empty() {
            return Err(SlotError::configuration(
                "highAvailability.slotPrefix must not be empty while enabled",
            ));
        }
        self.synchronize_replicas.compile_exclude_patterns()?;
        Ok(())
    }
}
