use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::{DEFAULT_DISPATCH_CAPACITY, EventSubscriber};
use crate::log::EventLog;
use crate::store::{AppendOptions, AppendReceipt, EventStore};
use crate::{Event, OrderId, Result};

/// Event store backed by a durable [`EventLog`].
#[derive(Clone)]
pub struct LogEventStore {
    log: Arc<EventLog>,
}

impl LogEventStore {
    /// Opens (or creates) the log at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_DISPATCH_CAPACITY).await
    }

    /// Opens the log with a custom subscriber dispatch capacity.
    pub async fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let log = EventLog::open_with_capacity(path, capacity).await?;
        Ok(Self::from_log(Arc::new(log)))
    }

    /// Wraps an already opened log.
    pub fn from_log(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl EventStore for LogEventStore {
    fn next_order_id(&self) -> Result<OrderId> {
        self.log.next_order_id()
    }

    async fn save_event(&self, event: Event, options: AppendOptions) -> Result<AppendReceipt> {
        self.log.append(event, options).await
    }

    async fn events_for_order(&self, order_id: OrderId) -> Result<Vec<Event>> {
        Ok(self.log.events_for_order(order_id).await)
    }

    async fn all_events(&self) -> Result<Vec<Event>> {
        Ok(self.log.all_events().await)
    }

    async fn events_after(&self, position: u64) -> Result<Vec<Event>> {
        Ok(self.log.events_after(position).await)
    }

    async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.log.subscribe(subscriber).await;
    }
}
