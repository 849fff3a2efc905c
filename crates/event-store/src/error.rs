use thiserror::Error;

use crate::{OrderId, Version};

/// Errors that can occur when interacting with the event log or event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrency conflict occurred when appending an event.
    /// The expected version did not match the actual version.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The log file could not be opened, written or synced.
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// A persisted record could not be decoded while loading the log.
    #[error("Corrupt event log at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },

    /// A record carried a `type` discriminator this build does not know.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// A record was well-formed JSON but violates the record layout.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Every order identifier has been issued.
    #[error("Order identifiers exhausted")]
    OrderIdsExhausted,

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
