//! Slot Classification
//!
//! Explicit decision table deciding what the engine may do with an
//! observed slot name. Replaces boolean short-circuits so that every
//! reconciliation branch is exhaustive and independently testable:
//! - HA-prefixed names take precedence and are never pattern-filtered
//! - Non-HA names are only touched while user synchronization is enabled

use super::config::ReplicationSlotsConfiguration;
use super::errors::SlotResult;

/// What the engine is allowed to do with a slot of a given name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    /// HA slot mirroring a known standby; fully owned by the engine
    ManagedHa,

    /// User slot the engine may manage (existence only, never its LSN)
    ManagedUser,

    /// User slot outside the engine's concern; left untouched
    Unmanaged,

    /// User slot the policy now excludes; an existing one is dropped
    Excluded,
}

impl SlotClass {
    /// Whether the engine owns the slot's lifecycle.
    pub fn is_managed(&self) -> bool {
        matches!(self, SlotClass::ManagedHa | SlotClass::ManagedUser)
    }
}

/// Classify a slot name under the given policy.
///
/// HA precedence: a name carrying the HA prefix is classified before the
/// exclude patterns are ever evaluated, so a malformed pattern cannot
/// affect HA slots and user filters can never capture them.
pub fn classify(name: &str, config: &ReplicationSlotsConfiguration) -> SlotResult<SlotClass> {
    if config.high_availability.is_ha_slot(name) {
        return Ok(SlotClass::ManagedHa);
    }
    if !config.synchronize_replicas.enabled {
        return Ok(SlotClass::Unmanaged);
    }
    if config.synchronize_replicas.is_excluded_by_user(name)? {
        return Ok(SlotClass::Excluded);
    }
    Ok(SlotClass::ManagedUser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::config::SynchronizeReplicasConfig;

    fn config_with_patterns(patterns: &[&str]) -> ReplicationSlotsConfiguration {
        ReplicationSlotsConfiguration {
            synchronize_replicas: SynchronizeReplicasConfig {
                enabled: true,
                exclude_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_ha_prefix_classifies_as_managed_ha() {
        let config = config_with_patterns(&[]);
        assert_eq!(
            classify("_ha_standby_1", &config).unwrap(),
            SlotClass::ManagedHa
        );
    }

    #[test]
    fn test_ha_precedence_over_exclude_patterns() {
        // A filter capturing everything still cannot reach HA slots.
        let config = config_with_patterns(&[".*"]);
        assert_eq!(
            classify("_ha_standby_1", &config).unwrap(),
            SlotClass::ManagedHa
        );
        assert_eq!(classify("userslot_x", &config).unwrap(), SlotClass::Excluded);
    }

    #[test]
    fn test_ha_slots_skip_malformed_patterns() {
        let config = config_with_patterns(&["[broken"]);
        // HA classification never evaluates the patterns.
        assert_eq!(
            classify("_ha_standby_1", &config).unwrap(),
            SlotClass::ManagedHa
        );
        // Non-HA classification must surface the configuration error.
        assert!(classify("userslot_x", &config)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_non_ha_included_is_managed_user() {
        let config = config_with_patterns(&["^legacy_"]);
        assert_eq!(
            classify("userslot_x", &config).unwrap(),
            SlotClass::ManagedUser
        );
        assert_eq!(
            classify("legacy_reader", &config).unwrap(),
            SlotClass::Excluded
        );
    }

    #[test]
    fn test_disabled_synchronization_leaves_user_slots_alone() {
        let mut config = config_with_patterns(&[".*"]);
        config.synchronize_replicas.enabled = false;
        assert_eq!(classify("userslot_x", &config).unwrap(), SlotClass::Unmanaged);
    }

    #[test]
    fn test_managed_predicate() {
        assert!(SlotClass::ManagedHa.is_managed());
        assert!(SlotClass::ManagedUser.is_managed());
        assert!(!SlotClass::Unmanaged.is_managed());
        assert!(!SlotClass::Excluded.is_managed());
    }
}
