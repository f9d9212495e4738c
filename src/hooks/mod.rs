//! Hook Pipeline
//!
//! State-free dispatcher around each reconciled object. Plugins observe
//! or short-circuit native mutations:
//! - A pre-hook may claim a mutation (`Skip`) or end the tick early
//!   (`Requeue`)
//! - The post-hook always sees the native outcome, including skips and
//!   failures
//! - No plugin registered is the normal state: the engine takes its hooks
//!   as an explicit constructor dependency with a pass-through default,
//!   never through a fallible ambient lookup

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::context::{ClusterIdentity, ReconcileContext};

/// Decision returned by a hook.
///
/// Post-reconcile hooks cannot skip a mutation that already happened;
/// `Skip` from a post-hook is treated as `Proceed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    /// Apply the native mutation (pre) / continue the tick (post)
    Proceed,

    /// The plugin claims this mutation; the engine must not apply it
    Skip,

    /// End the tick early and reschedule after the given delay
    Requeue(Duration),
}

/// Native mutation outcome as seen by the post-hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The directory applied the mutation
    Applied,

    /// A pre-hook claimed the mutation; nothing was applied natively
    Skipped,

    /// The directory refused or failed the mutation
    Failed(String),
}

impl MutationOutcome {
    /// String form carried into hook/log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOutcome::Applied => "applied",
            MutationOutcome::Skipped => "skipped",
            MutationOutcome::Failed(_) => "failed",
        }
    }
}

/// The mutation planned for a target object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedOperation {
    /// Create a missing desired slot
    Create,
    /// Advance an existing slot's position
    Update,
    /// Drop a stale or excluded slot
    Delete,
}

impl fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PlannedOperation::Create => "create",
            PlannedOperation::Update => "update",
            PlannedOperation::Delete => "delete",
        };
        write!(f, "{}", text)
    }
}

/// Reference to the object a hook is invoked for, keyed by
/// (cluster identity, slot name) plus the operation the engine plans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotObjectRef {
    /// Cluster the slot belongs to
    pub cluster: ClusterIdentity,

    /// Name of the slot being reconciled
    pub slot_name: String,

    /// Mutation the engine plans for it
    pub operation: PlannedOperation,
}

impl SlotObjectRef {
    /// Create an object reference.
    pub fn new(
        cluster: ClusterIdentity,
        slot_name: impl Into<String>,
        operation: PlannedOperation,
    ) -> Self {
        Self {
            cluster,
            slot_name: slot_name.into(),
            operation,
        }
    }
}

/// Extension point invoked around every native mutation.
///
/// Implementations must be safe to call repeatedly for the same object:
/// the engine re-derives its plan every tick and will re-invoke hooks for
/// mutations that previously failed or were skipped.
pub trait ReconcilerHooks: Send + Sync {
    /// Invoked before the engine applies a mutation to `target`.
    fn pre_reconcile<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        target: &'a SlotObjectRef,
    ) -> BoxFuture<'a, HookDecision>;

    /// Invoked after the native mutation, with its outcome visible.
    fn post_reconcile<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        target: &'a SlotObjectRef,
        outcome: &'a MutationOutcome,
    ) -> BoxFuture<'a, HookDecision>;
}

/// Default hooks when no plugin is registered: both hooks proceed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHooks;

impl ReconcilerHooks for PassthroughHooks {
    fn pre_reconcile<'a>(
        &'a self,
        _ctx: &'a ReconcileContext,
        _target: &'a SlotObjectRef,
    ) -> BoxFuture<'a, HookDecision> {
        Box::pin(async { HookDecision::Proceed })
    }

    fn post_reconcile<'a>(
        &'a self,
        _ctx: &'a ReconcileContext,
        _target: &'a SlotObjectRef,
        _outcome: &'a MutationOutcome,
    ) -> BoxFuture<'a, HookDecision> {
        Box::pin(async { HookDecision::Proceed })
    }
}
