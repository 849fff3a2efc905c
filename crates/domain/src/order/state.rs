//! Order status machine and the state folded from an order's events.

use chrono::{DateTime, Utc};
use common::OrderId;
use event_store::{Event, EventPayload};
use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Unknown ──► Created ──┬──► Paid ──┐
///                       │           ▼
///                       └──────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// No OrderCreated event has been folded yet.
    #[default]
    Unknown,

    /// Order was placed and awaits payment.
    Created,

    /// Order was paid.
    Paid,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Paid)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unknown => "unknown",
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current state of one order, derived by folding its events in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub id: OrderId,
    pub customer_id: String,
    pub items: Vec<String>,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderState {
    /// Creates the empty state an order has before any event.
    pub fn new(id: OrderId) -> Self {
        Self {
            id,
            customer_id: String::new(),
            items: Vec::new(),
            status: OrderStatus::Unknown,
            created_at: None,
            updated_at: None,
        }
    }

    /// Folds a sequence of events for `id` into a state.
    ///
    /// Events belonging to other orders are ignored.
    pub fn from_events<'a>(id: OrderId, events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut state = Self::new(id);
        for event in events {
            state.apply(event);
        }
        state
    }

    /// Applies one event. Pure and infallible: events are facts.
    pub fn apply(&mut self, event: &Event) {
        if event.order_id != self.id {
            return;
        }

        match &event.payload {
            EventPayload::OrderCreated(data) => {
                self.customer_id = data.customer_id.clone();
                self.items = data.items.clone();
                self.status = OrderStatus::Created;
                self.created_at = Some(event.timestamp);
            }
            EventPayload::OrderPaid(_) => {
                self.status = OrderStatus::Paid;
            }
            EventPayload::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
        }
        self.updated_at = Some(event.timestamp);
    }

    /// Returns true once any event for this order has been folded.
    pub fn exists(&self) -> bool {
        self.status != OrderStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use event_store::{OrderCancelledData, OrderCreatedData, OrderPaidData};

    use super::*;

    fn order(id: u64) -> OrderId {
        OrderId::new(id).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn created(id: u64, hour: u32) -> Event {
        Event::at(
            order(id),
            at(hour),
            EventPayload::OrderCreated(OrderCreatedData {
                customer_id: "alice".to_string(),
                items: vec!["book".to_string(), "pen".to_string()],
            }),
        )
    }

    #[test]
    fn test_default_status_is_unknown() {
        assert_eq!(OrderStatus::default(), OrderStatus::Unknown);
        assert!(!OrderState::new(order(1)).exists());
    }

    #[test]
    fn test_only_created_can_pay() {
        assert!(!OrderStatus::Unknown.can_pay());
        assert!(OrderStatus::Created.can_pay());
        assert!(!OrderStatus::Paid.can_pay());
        assert!(!OrderStatus::Cancelled.can_pay());
    }

    #[test]
    fn test_can_cancel_created_and_paid() {
        assert!(!OrderStatus::Unknown.can_cancel());
        assert!(OrderStatus::Created.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::Unknown.to_string(), "unknown");
        assert_eq!(OrderStatus::Created.to_string(), "created");
        assert_eq!(OrderStatus::Paid.to_string(), "paid");
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_fold_created_paid_cancelled() {
        let events = vec![
            created(1, 10),
            Event::at(order(1), at(11), EventPayload::OrderPaid(OrderPaidData {})),
            Event::at(
                order(1),
                at(12),
                EventPayload::OrderCancelled(OrderCancelledData {
                    reason: "late".to_string(),
                }),
            ),
        ];

        let state = OrderState::from_events(order(1), &events);

        assert_eq!(state.customer_id, "alice");
        assert_eq!(state.items, vec!["book".to_string(), "pen".to_string()]);
        assert_eq!(state.status, OrderStatus::Cancelled);
        assert_eq!(state.created_at, Some(at(10)));
        assert_eq!(state.updated_at, Some(at(12)));
    }

    #[test]
    fn test_fold_ignores_other_orders() {
        let events = vec![created(1, 10), created(2, 11)];
        let state = OrderState::from_events(order(1), &events);
        assert_eq!(state.updated_at, Some(at(10)));
    }

    #[test]
    fn test_serialization() {
        let state = OrderState::from_events(order(3), &[created(3, 9)]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["status"], "created");

        let back: OrderState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
