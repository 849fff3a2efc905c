use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dispatch::{DEFAULT_DISPATCH_CAPACITY, Dispatcher, EventSubscriber, Notification};
use crate::history::EventHistory;
use crate::store::{AppendOptions, AppendReceipt, EventStore, OrderIdCounter};
use crate::{Event, EventStoreError, OrderId, Result};

/// In-memory event store implementation for testing.
///
/// This implementation keeps all events in memory and provides
/// the same interface as the file-backed store.
#[derive(Clone)]
pub struct InMemoryEventStore {
    history: Arc<RwLock<EventHistory>>,
    counter: Arc<OrderIdCounter>,
    dispatcher: Arc<Dispatcher>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DISPATCH_CAPACITY)
    }

    /// Creates an empty store with a custom subscriber dispatch capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Arc::new(RwLock::new(EventHistory::new())),
            counter: Arc::new(OrderIdCounter::default()),
            dispatcher: Arc::new(Dispatcher::new(capacity)),
        }
    }

    /// Creates a store pre-populated with `events` in append order.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let history = EventHistory::from_events(events);
        let counter = OrderIdCounter::starting_after(history.max_order_id());
        Self {
            history: Arc::new(RwLock::new(history)),
            counter: Arc::new(counter),
            dispatcher: Arc::new(Dispatcher::default()),
        }
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.history.read().await.len()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    fn next_order_id(&self) -> Result<OrderId> {
        self.counter.next().ok_or(EventStoreError::OrderIdsExhausted)
    }

    async fn save_event(&self, event: Event, options: AppendOptions) -> Result<AppendReceipt> {
        let receipt = {
            let mut history = self.history.write().await;
            history.check_append(event.order_id, &options)?;
            // Observed before the event becomes visible, so an allocation that
            // starts after the append can never return this id.
            self.counter.observe(event.order_id);
            let receipt = history.push(event.clone());
            // Publish under the lock so notifications keep append order.
            self.dispatcher.publish(Notification {
                position: receipt.position,
                event: event.clone(),
            });
            receipt
        };

        metrics::counter!("event_store_events_appended_total").increment(1);

        Ok(receipt)
    }

    async fn events_for_order(&self, order_id: OrderId) -> Result<Vec<Event>> {
        Ok(self.history.read().await.for_order(order_id))
    }

    async fn all_events(&self) -> Result<Vec<Event>> {
        Ok(self.history.read().await.all())
    }

    async fn events_after(&self, position: u64) -> Result<Vec<Event>> {
        Ok(self.history.read().await.after(position))
    }

    async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.dispatcher.subscribe(subscriber).await;
    }
}
