use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OrderId;

/// Version number of an order, used for optimistic concurrency control.
///
/// Versions start at 1 for the first event and increment by 1 for each
/// subsequent event on the same order. An order with no events is at
/// version 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for an order with no events.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Data for the OrderCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    /// The customer who placed the order.
    pub customer_id: String,

    /// Ordered list of items in the order.
    pub items: Vec<String>,
}

/// Data for the OrderPaid event. Carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidData {}

/// Data for the OrderCancelled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledData {
    /// Reason for cancellation.
    pub reason: String,
}

/// The variant-specific part of an order event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// Order was created.
    OrderCreated(OrderCreatedData),

    /// Order was paid.
    OrderPaid(OrderPaidData),

    /// Order was cancelled.
    OrderCancelled(OrderCancelledData),
}

impl EventPayload {
    /// Returns the discriminator written to the `type` field of a record.
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::OrderCreated(_) => "OrderCreated",
            EventPayload::OrderPaid(_) => "OrderPaid",
            EventPayload::OrderCancelled(_) => "OrderCancelled",
        }
    }
}

/// An immutable fact about one order.
///
/// Events are ordered by append order, not by timestamp; the timestamp is
/// informational and fixed when the event is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The order this event belongs to.
    pub order_id: OrderId,

    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// Variant-specific payload.
    pub payload: EventPayload,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(order_id: OrderId, payload: EventPayload) -> Self {
        Self::at(order_id, Utc::now(), payload)
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(order_id: OrderId, timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            order_id,
            timestamp,
            payload,
        }
    }

    /// Creates an OrderCreated event.
    pub fn order_created(
        order_id: OrderId,
        customer_id: impl Into<String>,
        items: Vec<String>,
    ) -> Self {
        Self::new(
            order_id,
            EventPayload::OrderCreated(OrderCreatedData {
                customer_id: customer_id.into(),
                items,
            }),
        )
    }

    /// Creates an OrderPaid event.
    pub fn order_paid(order_id: OrderId) -> Self {
        Self::new(order_id, EventPayload::OrderPaid(OrderPaidData {}))
    }

    /// Creates an OrderCancelled event.
    pub fn order_cancelled(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::new(
            order_id,
            EventPayload::OrderCancelled(OrderCancelledData {
                reason: reason.into(),
            }),
        )
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64) -> OrderId {
        OrderId::new(id).unwrap()
    }

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
    }

    #[test]
    fn version_initial_and_first() {
        assert_eq!(Version::initial().as_u64(), 0);
        assert_eq!(Version::first().as_u64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn event_type_names() {
        let id = order(1);
        assert_eq!(
            Event::order_created(id, "c1", vec!["x".into()]).event_type(),
            "OrderCreated"
        );
        assert_eq!(Event::order_paid(id).event_type(), "OrderPaid");
        assert_eq!(
            Event::order_cancelled(id, "changed mind").event_type(),
            "OrderCancelled"
        );
    }

    #[test]
    fn constructors_fill_payload() {
        let event = Event::order_created(order(3), "alice", vec!["book".into(), "pen".into()]);
        assert_eq!(event.order_id, order(3));
        match event.payload {
            EventPayload::OrderCreated(data) => {
                assert_eq!(data.customer_id, "alice");
                assert_eq!(data.items, vec!["book".to_string(), "pen".to_string()]);
            }
            other => panic!("Expected OrderCreated, got {other:?}"),
        }
    }
}
