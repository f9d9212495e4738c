//! Reconciliation Errors
//!
//! Per-mutation errors are accumulated and returned together at the end
//! of a tick so one failing slot never blocks convergence of the others.
//! Listing and configuration errors abort the tick immediately: no valid
//! diff can be computed from them.

use std::fmt;
use std::time::Duration;

use crate::hooks::PlannedOperation;
use crate::slots::SlotError;

/// One failed mutation within a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFailure {
    /// Slot the mutation targeted
    pub slot_name: String,
    /// What the engine attempted
    pub operation: PlannedOperation,
    /// Why it failed
    pub error: SlotError,
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.slot_name, self.error)
    }
}

/// Error returned by one reconciliation tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The actual slot set could not be listed; the tick produced no diff
    Listing(SlotError),

    /// The policy is malformed; retrying cannot help until it changes
    Configuration(SlotError),

    /// The tick ran to completion but some mutations failed
    Mutations {
        /// Each failed mutation
        failures: Vec<MutationFailure>,
        /// Delay a hook requested during the same tick; surfaced here so
        /// the failing path does not drop it
        requeue_after: Option<Duration>,
    },
}

impl ReconcileError {
    /// Wrap a listing-phase error, routing configuration errors to their
    /// own variant.
    pub fn from_listing(error: SlotError) -> Self {
        if error.is_configuration() {
            Self::Configuration(error)
        } else {
            Self::Listing(error)
        }
    }

    /// The per-mutation failures, if any.
    pub fn failures(&self) -> &[MutationFailure] {
        match self {
            Self::Mutations { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Delay a hook requested before the tick surfaced its failures.
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Mutations { requeue_after, .. } => *requeue_after,
            _ => None,
        }
    }

    /// Whether rerunning the tick can clear this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// Whether any part of this error was a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Listing(error) | Self::Configuration(error) => error.is_cancelled(),
            Self::Mutations { failures, .. } => failures.iter().any(|f| f.error.is_cancelled()),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing(error) => write!(f, "Listing replication slots failed: {}", error),
            Self::Configuration(error) => write!(f, "Invalid slot policy: {}", error),
            Self::Mutations { failures, .. } => {
                write!(f, "{} slot mutation(s) failed", failures.len())?;
                for failure in failures {
                    write!(f, "; {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
