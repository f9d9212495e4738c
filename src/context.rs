//! Reconciliation Context
//!
//! Per-tick context handed through the engine, the directory, and the
//! hook pipeline. Carries the cluster identity, a tick id for tracing,
//! and the cancellation token every in-flight database call must observe.

use std::fmt;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of the managed cluster a tick belongs to.
///
/// The surrounding scheduler guarantees at most one in-flight tick per
/// cluster identity; the engine performs no locking of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterIdentity {
    /// Namespace the cluster lives in
    pub namespace: String,
    /// Cluster name within the namespace
    pub name: String,
}

impl ClusterIdentity {
    /// Create a cluster identity.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Context for one reconciliation tick
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Tick id for tracing
    pub reconcile_id: Uuid,

    /// Cluster this tick converges
    pub cluster: ClusterIdentity,

    /// Token cancelling every in-flight operation of this tick
    cancellation: CancellationToken,

    /// Tick start, for duration tracking
    started_at: Instant,
}

impl ReconcileContext {
    /// Create a context with a fresh cancellation token.
    pub fn new(cluster: ClusterIdentity) -> Self {
        Self::with_cancellation(cluster, CancellationToken::new())
    }

    /// Create a context bound to the caller's cancellation token
    /// (e.g. a tick deadline owned by the scheduler).
    pub fn with_cancellation(cluster: ClusterIdentity, cancellation: CancellationToken) -> Self {
        Self {
            reconcile_id: Uuid::new_v4(),
            cluster,
            cancellation,
            started_at: Instant::now(),
        }
    }

    /// The tick's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the tick has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Elapsed time since the tick started, in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_identity_display() {
        let cluster = ClusterIdentity::new("pg", "main");
        assert_eq!(cluster.to_string(), "pg/main");
    }

    #[test]
    fn test_fresh_context_is_not_cancelled() {
        let ctx = ReconcileContext::new(ClusterIdentity::new("pg", "main"));
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_external_token_cancels_the_tick() {
        let token = CancellationToken::new();
        let ctx =
            ReconcileContext::with_cancellation(ClusterIdentity::new("pg", "main"), token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_each_tick_gets_a_distinct_id() {
        let cluster = ClusterIdentity::new("pg", "main");
        let a = ReconcileContext::new(cluster.clone());
        let b = ReconcileContext::new(cluster);
        assert_ne!(a.reconcile_id, b.reconcile_id);
    }
}
