use std::collections::HashMap;

use crate::{
    AppendOptions, AppendReceipt, Event, EventStoreError, OrderId, Result, Version,
};

/// In-memory, append-only event history with a per-order index.
///
/// Shared by the file-backed log (as its mirror) and the in-memory store.
/// Positions are 1-based indexes into the global append order.
#[derive(Debug, Clone, Default)]
pub struct EventHistory {
    events: Vec<Event>,
    by_order: HashMap<OrderId, Vec<usize>>,
}

impl EventHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from events in append order.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut history = Self::new();
        for event in events {
            history.push(event);
        }
        history
    }

    /// Returns the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the current version of an order (its event count).
    pub fn version_of(&self, order_id: OrderId) -> Version {
        let count = self.by_order.get(&order_id).map_or(0, Vec::len);
        Version::new(count as u64)
    }

    /// Returns the highest order ID that appears in the history.
    pub fn max_order_id(&self) -> Option<OrderId> {
        self.by_order.keys().max().copied()
    }

    /// Checks the expected version in `options` against the order's current version.
    pub fn check_append(&self, order_id: OrderId, options: &AppendOptions) -> Result<Version> {
        let actual = self.version_of(order_id);
        if let Some(expected) = options.expected_version
            && expected != actual
        {
            return Err(EventStoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            });
        }
        Ok(actual)
    }

    /// Appends an event without any checks.
    pub fn push(&mut self, event: Event) -> AppendReceipt {
        let index = self.events.len();
        let slots = self.by_order.entry(event.order_id).or_default();
        slots.push(index);
        let version = Version::new(slots.len() as u64);

        self.events.push(event);

        AppendReceipt {
            position: (index + 1) as u64,
            version,
        }
    }

    /// Returns a copy of every event in append order.
    pub fn all(&self) -> Vec<Event> {
        self.events.clone()
    }

    /// Returns a copy of the events of one order in append order.
    pub fn for_order(&self, order_id: OrderId) -> Vec<Event> {
        self.by_order
            .get(&order_id)
            .map(|slots| slots.iter().map(|&i| self.events[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Returns a copy of the events with a position greater than `position`.
    pub fn after(&self, position: u64) -> Vec<Event> {
        let start = usize::try_from(position)
            .unwrap_or(usize::MAX)
            .min(self.events.len());
        self.events[start..].to_vec()
    }
}
