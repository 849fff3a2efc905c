//! Order aggregate implementation.

use common::OrderId;
use event_store::{Event, Version};

use crate::aggregate::Aggregate;

use super::{OrderError, OrderState, OrderStatus};

/// Order aggregate root.
///
/// Wraps the folded [`OrderState`] together with the version it was loaded
/// at, and turns commands into events.
#[derive(Debug, Clone)]
pub struct Order {
    state: OrderState,
    version: Version,
}

impl Aggregate for Order {
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn empty(id: OrderId) -> Self {
        Self {
            state: OrderState::new(id),
            version: Version::initial(),
        }
    }

    fn exists(&self) -> bool {
        self.state.exists()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: &Event) {
        self.state.apply(event);
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.state.id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.state.status
    }

    /// Returns the folded state.
    pub fn state(&self) -> &OrderState {
        &self.state
    }

    /// Consumes the aggregate, returning its state.
    pub fn into_state(self) -> OrderState {
        self.state
    }
}

// Command methods (return events)
impl Order {
    /// Creates the order.
    pub fn create(
        &self,
        customer_id: impl Into<String>,
        items: Vec<String>,
    ) -> Result<Vec<Event>, OrderError> {
        if self.exists() {
            return Err(OrderError::AlreadyCreated);
        }

        let customer_id = customer_id.into();
        if customer_id.trim().is_empty() {
            return Err(OrderError::CustomerIdRequired);
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        Ok(vec![Event::order_created(self.id(), customer_id, items)])
    }

    /// Pays for the order.
    pub fn pay(&self) -> Result<Vec<Event>, OrderError> {
        if !self.status().can_pay() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status(),
                action: "pay",
            });
        }

        Ok(vec![Event::order_paid(self.id())])
    }

    /// Cancels the order.
    pub fn cancel(&self, reason: impl Into<String>) -> Result<Vec<Event>, OrderError> {
        if !self.status().can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status(),
                action: "cancel",
            });
        }

        Ok(vec![Event::order_cancelled(self.id(), reason)])
    }
}
