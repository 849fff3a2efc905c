//! Projection error types.

use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// An event arrived past the next expected position; earlier events
    /// were missed and must be caught up from the store.
    #[error("Projection gap: expected position {expected}, got {actual}")]
    Gap { expected: u64, actual: u64 },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
