//! Order commands.

use common::OrderId;

use super::OrderError;

/// Reason recorded when a cancellation gives none.
pub const DEFAULT_CANCEL_REASON: &str = "no reason given";

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The customer placing the order.
    pub customer_id: String,

    /// Items in the order, in the order given.
    pub items: Vec<String>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(customer_id: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            items,
        }
    }

    /// Checks the command input before an order ID is allocated.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.customer_id.trim().is_empty() {
            return Err(OrderError::CustomerIdRequired);
        }
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        Ok(())
    }
}

/// Command to pay for an order.
#[derive(Debug, Clone, Copy)]
pub struct PayOrder {
    /// The order to pay.
    pub order_id: OrderId,
}

impl PayOrder {
    /// Creates a new PayOrder command.
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    /// The order to cancel.
    pub order_id: OrderId,

    /// Reason for cancellation. May be blank.
    pub reason: String,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
        }
    }

    /// Returns the reason to record, falling back to the default when blank.
    pub fn effective_reason(&self) -> &str {
        let reason = self.reason.trim();
        if reason.is_empty() {
            DEFAULT_CANCEL_REASON
        } else {
            reason
        }
    }
}
