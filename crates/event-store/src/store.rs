use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::dispatch::EventSubscriber;
use crate::{Event, OrderId, Result, Version};

/// Options for appending an event to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the order for optimistic concurrency control.
    /// If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the order to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the order to have no events yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Where an appended event landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// 1-based position in the global append order.
    pub position: u64,

    /// Version of the order after the append.
    pub version: Version,
}

/// Core trait for event store implementations.
///
/// The store is the single authority for order identifier allocation and
/// event persistence. It does not validate business rules. Appends are
/// serialized; reads may run concurrently with an append and observe either
/// the state before or after it.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Allocates a fresh order identifier.
    ///
    /// Never returns the same value twice, even under concurrent calls.
    /// Fails with `OrderIdsExhausted` once no identifier is left.
    fn next_order_id(&self) -> Result<OrderId>;

    /// Persists an event and notifies subscribers.
    ///
    /// If `options.expected_version` is set, fails with `ConcurrencyConflict`
    /// when the order's current version differs.
    async fn save_event(&self, event: Event, options: AppendOptions) -> Result<AppendReceipt>;

    /// Returns the events of one order in append order.
    async fn events_for_order(&self, order_id: OrderId) -> Result<Vec<Event>>;

    /// Returns the entire history in append order.
    async fn all_events(&self) -> Result<Vec<Event>>;

    /// Returns the events whose position is greater than `position`.
    async fn events_after(&self, position: u64) -> Result<Vec<Event>>;

    /// Registers a subscriber for all future appends.
    async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>);
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends an event without a version check.
    async fn append_event(&self, event: Event) -> Result<AppendReceipt> {
        self.save_event(event, AppendOptions::new()).await
    }

    /// Returns the current version of an order.
    async fn order_version(&self, order_id: OrderId) -> Result<Version> {
        let count = self.events_for_order(order_id).await?.len();
        Ok(Version::new(count as u64))
    }

    /// Checks if an order has any events.
    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(!self.events_for_order(order_id).await?.is_empty())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn next_order_id(&self) -> Result<OrderId> {
        (**self).next_order_id()
    }

    async fn save_event(&self, event: Event, options: AppendOptions) -> Result<AppendReceipt> {
        (**self).save_event(event, options).await
    }

    async fn events_for_order(&self, order_id: OrderId) -> Result<Vec<Event>> {
        (**self).events_for_order(order_id).await
    }

    async fn all_events(&self) -> Result<Vec<Event>> {
        (**self).all_events().await
    }

    async fn events_after(&self, position: u64) -> Result<Vec<Event>> {
        (**self).events_after(position).await
    }

    async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        (**self).subscribe(subscriber).await
    }
}

/// Monotonic order identifier counter.
///
/// Holds the last issued (or observed) identifier.
#[derive(Debug, Default)]
pub struct OrderIdCounter(AtomicU64);

impl OrderIdCounter {
    /// Creates a counter whose next identifier follows `max`.
    pub fn starting_after(max: Option<OrderId>) -> Self {
        Self(AtomicU64::new(max.map_or(0, |id| id.as_u64())))
    }

    /// Issues the next identifier, or `None` once `u64::MAX` has been issued
    /// or observed. An exhausted counter stays exhausted.
    pub fn next(&self) -> Option<OrderId> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .ok()
            .and_then(OrderId::after)
    }

    /// Raises the counter so `order_id` is never issued.
    pub fn observe(&self, order_id: OrderId) {
        self.0.fetch_max(order_id.as_u64(), Ordering::SeqCst);
    }

    /// Returns the last issued or observed raw value.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
