//! Slot Operation Errors
//!
//! Error taxonomy for the slot subsystem:
//! - Query and row-decode errors fail one operation, never the whole tick
//! - Configuration errors are global and cannot be retried away
//! - Cancellation is its own kind so callers can tell "try again now"
//!   from "try again later"

use thiserror::Error;

/// Result type for slot operations
pub type SlotResult<T> = Result<T, SlotError>;

/// Errors raised by slot listing, mutation, and policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Query or transport failure against the target instance
    #[error("Query failed: {0}")]
    Query(String),

    /// A listing row could not be decoded into a slot
    #[error("Row decoding failed: {0}")]
    RowDecode(String),

    /// Malformed policy (e.g. an exclude pattern that does not compile)
    #[error("Invalid slot policy: {0}")]
    Configuration(String),

    /// A slot with this name already exists on the instance
    #[error("Slot already exists: {0}")]
    AlreadyExists(String),

    /// No slot with this name exists on the instance
    #[error("Slot not found: {0}")]
    NotFound(String),

    /// The surrounding tick was cancelled while this operation was in flight
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl SlotError {
    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a row-decode error.
    pub fn row_decode(message: impl Into<String>) -> Self {
        Self::RowDecode(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a cancellation error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled(operation.into())
    }

    /// Configuration errors invalidate the whole tick, not one mutation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check whether this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Whether rerunning the same tick can clear this error.
    pub fn is_retryable(&self) -> bool {
        !self.is_configuration()
    }
}
