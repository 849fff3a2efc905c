//! Domain error types.

use common::OrderId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The order rejected the command.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// No events exist for the order.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

impl DomainError {
    /// Returns true if the command input was invalid.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Order(e) if e.is_validation())
    }

    /// Returns true if the target order does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::OrderNotFound(_))
    }

    /// Returns true if a concurrent writer changed the order first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }
}
