//! Reconciliation Engine
//!
//! Converges the actual slot set toward the desired one, once per tick:
//! - State is re-read every tick; nothing is cached across ticks
//! - Mutations apply sequentially, each wrapped in pre/post hooks
//! - Per-mutation errors accumulate; the tick attempts every mutation
//! - A `create` hitting an existing name and a `delete` hitting a
//!   removed one are tolerated: the slot table already converged
//! - Cancellation keeps partial progress and stops further mutations

use std::sync::Arc;
use std::time::Duration;

use crate::context::ReconcileContext;
use crate::directory::SlotDirectory;
use crate::hooks::{
    HookDecision, MutationOutcome, PassthroughHooks, ReconcilerHooks, SlotObjectRef,
};
use crate::observability::Logger;
use crate::slots::{ReplicationSlotsConfiguration, SlotError, SlotResult};
use crate::topology::{compute_desired, ClusterTopology};

use super::errors::{MutationFailure, ReconcileError};
use super::plan::{compute_plan, SlotAction};

/// What one tick did, for the scheduling collaborator to log and act on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Slots created this tick
    pub created: usize,
    /// Slots advanced this tick
    pub updated: usize,
    /// Slots dropped this tick
    pub deleted: usize,
    /// Mutations claimed by a pre-hook instead of applied natively
    pub skipped: usize,
    /// Delay after which a hook asked for the tick to be rerun
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// Total native mutations applied.
    pub fn mutation_count(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// True when the tick found nothing to do.
    pub fn is_converged(&self) -> bool {
        self.mutation_count() == 0 && self.skipped == 0 && self.requeue_after.is_none()
    }
}

/// The slot reconciliation engine for one directory binding.
///
/// Hooks are an explicit dependency: when no plugin is registered the
/// pass-through implementation is used, never a fallible ambient lookup.
pub struct SlotReconciler {
    directory: Arc<dyn SlotDirectory>,
    hooks: Arc<dyn ReconcilerHooks>,
}

impl SlotReconciler {
    /// Engine without plugins; hooks default to pass-through.
    pub fn new(directory: Arc<dyn SlotDirectory>) -> Self {
        Self {
            directory,
            hooks: Arc::new(PassthroughHooks),
        }
    }

    /// Replace the hook pipeline (builder style).
    pub fn with_hooks(mut self, hooks: Arc<dyn ReconcilerHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run one reconciliation tick for a cluster.
    ///
    /// Callers requeue on error with their own backoff. A hook-requested
    /// `requeue_after` asks for an earlier rerun on the hook's behalf and
    /// is carried on the outcome, or on the aggregate error when the same
    /// tick also had failing mutations.
    pub async fn reconcile_slots(
        &self,
        ctx: &ReconcileContext,
        config: &ReplicationSlotsConfiguration,
        topology: &ClusterTopology,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let actual = self
            .directory
            .list(ctx, config)
            .await
            .map_err(ReconcileError::from_listing)?;
        let desired = compute_desired(topology, config);
        let plan =
            compute_plan(&actual, &desired, config).map_err(ReconcileError::from_listing)?;

        let mut outcome = ReconcileOutcome::default();
        let mut failures = Vec::new();

        for action in plan {
            if ctx.is_cancelled() {
                failures.push(MutationFailure {
                    slot_name: action.slot_name().to_string(),
                    operation: action.operation(),
                    error: SlotError::cancelled("tick cancelled before mutation"),
                });
                break;
            }

            let target = SlotObjectRef::new(
                ctx.cluster.clone(),
                action.slot_name(),
                action.operation(),
            );

            let native_outcome = match self.hooks.pre_reconcile(ctx, &target).await {
                HookDecision::Proceed => match self.apply(ctx, &action).await {
                    Ok(()) => {
                        match action {
                            SlotAction::Create(_) => outcome.created += 1,
                            SlotAction::Update(_) => outcome.updated += 1,
                            SlotAction::Delete(_) => outcome.deleted += 1,
                        }
                        MutationOutcome::Applied
                    }
                    Err(error) => {
                        Logger::error(
                            "SLOT_MUTATION_FAILED",
                            &[
                                ("cluster", &ctx.cluster.to_string()),
                                ("slot", &target.slot_name),
                                ("operation", &target.operation.to_string()),
                                ("error", &error.to_string()),
                            ],
                        );
                        failures.push(MutationFailure {
                            slot_name: target.slot_name.clone(),
                            operation: target.operation,
                            error: error.clone(),
                        });
                        MutationOutcome::Failed(error.to_string())
                    }
                },
                HookDecision::Skip => {
                    outcome.skipped += 1;
                    MutationOutcome::Skipped
                }
                HookDecision::Requeue(after) => {
                    outcome.requeue_after = Some(after);
                    break;
                }
            };

            if let HookDecision::Requeue(after) =
                self.hooks.post_reconcile(ctx, &target, &native_outcome).await
            {
                outcome.requeue_after = Some(after);
                break;
            }
        }

        Logger::info(
            "SLOT_RECONCILE_TICK",
            &[
                ("cluster", &ctx.cluster.to_string()),
                ("reconcile_id", &ctx.reconcile_id.to_string()),
                ("created", &outcome.created.to_string()),
                ("updated", &outcome.updated.to_string()),
                ("deleted", &outcome.deleted.to_string()),
                ("skipped", &outcome.skipped.to_string()),
                ("failed", &failures.len().to_string()),
                ("elapsed_ms", &ctx.elapsed_ms().to_string()),
            ],
        );

        if failures.is_empty() {
            Ok(outcome)
        } else {
            Err(ReconcileError::Mutations {
                failures,
                requeue_after: outcome.requeue_after,
            })
        }
    }

    /// Apply one mutation, tolerating the races inherent to retries.
    async fn apply(&self, ctx: &ReconcileContext, action: &SlotAction) -> SlotResult<()> {
        match action {
            SlotAction::Create(slot) => match self.directory.create(ctx, slot).await {
                // Someone created it between list and apply; the next
                // tick advances it if needed.
                Err(SlotError::AlreadyExists(_)) => {
                    Logger::warn(
                        "SLOT_CREATE_RACE_TOLERATED",
                        &[
                            ("cluster", &ctx.cluster.to_string()),
                            ("slot", &slot.name),
                        ],
                    );
                    Ok(())
                }
                result => result,
            },
            SlotAction::Update(slot) => self.directory.update(ctx, slot).await,
            SlotAction::Delete(slot) => match self.directory.delete(ctx, slot).await {
                // Already gone; the slot table converged without us.
                Err(SlotError::NotFound(_)) => {
                    Logger::warn(
                        "SLOT_DROP_RACE_TOLERATED",
                        &[
                            ("cluster", &ctx.cluster.to_string()),
                            ("slot", &slot.name),
                        ],
                    );
                    Ok(())
                }
                result => result,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ClusterIdentity;
    use crate::directory::{InMemorySlotDirectory, IssuedOperation};
    use crate::slots::{Lsn, ReplicationSlot};
    use crate::topology::StandbyStatus;

    fn lsn(text: &str) -> Lsn {
        text.parse().unwrap()
    }

    fn ctx() -> ReconcileContext {
        ReconcileContext::new(ClusterIdentity::new("pg", "main"))
    }

    #[tokio::test]
    async fn test_create_tolerates_duplicate_races() {
        let directory = Arc::new(InMemorySlotDirectory::new());
        directory.insert(ReplicationSlot::high_availability(
            "_ha_standby_1",
            Some(lsn("0/1")),
        ));
        let engine = SlotReconciler::new(directory.clone());

        // The action was planned against a stale listing.
        let action = SlotAction::Create(ReplicationSlot::high_availability(
            "_ha_standby_1",
            Some(lsn("0/1")),
        ));
        assert!(engine.apply(&ctx(), &action).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_tolerates_already_removed() {
        let directory = Arc::new(InMemorySlotDirectory::new());
        let engine = SlotReconciler::new(directory.clone());

        let action = SlotAction::Delete(ReplicationSlot::high_availability("_ha_gone", None));
        assert!(engine.apply(&ctx(), &action).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_tick_keeps_partial_progress() {
        let directory = Arc::new(InMemorySlotDirectory::new());
        let engine = SlotReconciler::new(directory.clone());
        let context = ctx();
        context.cancellation().cancel();

        let config = ReplicationSlotsConfiguration::default();
        let topology = ClusterTopology::new(vec![StandbyStatus::positioned(
            "standby-1",
            lsn("0/1"),
        )]);

        // Listing itself is cancelled: the tick aborts with a
        // distinguishable error and no mutation was issued.
        let err = engine
            .reconcile_slots(&context, &config, &topology)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(directory.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_outcome_counts_mutations() {
        let directory = Arc::new(InMemorySlotDirectory::new());
        let engine = SlotReconciler::new(directory.clone());
        let config = ReplicationSlotsConfiguration::default();
        let topology = ClusterTopology::new(vec![
            StandbyStatus::positioned("standby-1", lsn("0/1")),
            StandbyStatus::positioned("standby-2", lsn("0/2")),
        ]);

        let outcome = engine
            .reconcile_slots(&ctx(), &config, &topology)
            .await
            .unwrap();
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.mutation_count(), 2);
        assert!(!outcome.is_converged());
        assert_eq!(
            directory
                .mutations()
                .iter()
                .filter(|op| matches!(op, IssuedOperation::Create { .. }))
                .count(),
            2
        );
    }
}
