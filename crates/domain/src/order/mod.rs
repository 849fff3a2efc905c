//! Order aggregate and related types.

mod aggregate;
mod commands;
mod service;
mod state;

pub use aggregate::Order;
pub use commands::*;
pub use service::OrderService;
pub use state::{OrderState, OrderStatus};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order has no items.
    #[error("Order must contain at least one item")]
    NoItems,

    /// Order is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// Order is already created.
    #[error("Order already created")]
    AlreadyCreated,
}

impl OrderError {
    /// Returns true if the command input itself was invalid.
    pub fn is_validation(&self) -> bool {
        matches!(self, OrderError::CustomerIdRequired | OrderError::NoItems)
    }
}
