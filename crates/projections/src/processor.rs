//! Projection processor for feeding events to projections.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{Event, EventStore, EventSubscriber, Notification, SubscriberError};
use tokio::sync::Mutex;

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Processes events from an event store and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: replays the events each projection has not seen yet
/// - Single event delivery: delivers a new event to all projections
/// - Rebuild: resets all projections and replays from scratch
///
/// Registered as an [`EventSubscriber`], it keeps projections up to date
/// asynchronously. A missed notification shows up as a position gap and is
/// repaired by catching up from the store.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    catch_up_lock: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up_lock: Mutex::new(()),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Runs catch-up processing: reads the events after the lowest projection
    /// position and delivers each to every projection that hasn't seen it.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _guard = self.catch_up_lock.lock().await;

        let mut from = u64::MAX;
        for projection in &self.projections {
            from = from.min(projection.position().await.events_processed);
        }
        if from == u64::MAX {
            return Ok(());
        }

        let events = self.store.events_after(from).await?;
        let mut delivered = 0u64;

        for (offset, event) in events.iter().enumerate() {
            let position = from + offset as u64 + 1;

            for projection in &self.projections {
                if projection.position().await.events_processed < position {
                    projection.handle(position, event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                    delivered += 1;
                }
            }
        }

        tracing::debug!(from, events = events.len(), delivered, "catch-up complete");

        Ok(())
    }

    /// Delivers a single event to all registered projections.
    ///
    /// A projection that reports a gap is brought up to date from the store
    /// before this returns.
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type()))]
    pub async fn process_event(&self, position: u64, event: &Event) -> Result<()> {
        let mut gap = false;

        for projection in &self.projections {
            match projection.handle(position, event).await {
                Ok(()) => {
                    metrics::counter!("projections_events_processed").increment(1);
                }
                Err(ProjectionError::Gap { expected, actual }) => {
                    tracing::warn!(
                        projection = projection.name(),
                        expected,
                        actual,
                        "projection missed events, catching up"
                    );
                    gap = true;
                }
                Err(e) => return Err(e),
            }
        }

        if gap {
            self.run_catch_up().await?;
        }
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

impl<S: EventStore + 'static> ProjectionProcessor<S> {
    /// Subscribes the processor to its store, then catches up.
    ///
    /// Subscribing first means nothing appended in between is missed;
    /// events seen by both paths are applied once.
    pub async fn start(self: Arc<Self>) -> Result<Arc<Self>> {
        self.store.subscribe(Arc::clone(&self) as Arc<dyn EventSubscriber>).await;
        self.run_catch_up().await?;
        Ok(self)
    }
}

#[async_trait]
impl<S: EventStore + 'static> EventSubscriber for ProjectionProcessor<S> {
    fn name(&self) -> &'static str {
        "ProjectionProcessor"
    }

    async fn on_event(
        &self,
        notification: &Notification,
    ) -> std::result::Result<(), SubscriberError> {
        self.process_event(notification.position, &notification.event)
            .await
            .map_err(SubscriberError::new)
    }

    async fn on_lagged(&self, position: u64) -> std::result::Result<(), SubscriberError> {
        tracing::warn!(position, "notifications dropped, catching up from the store");
        self.run_catch_up().await.map_err(SubscriberError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use common::OrderId;
    use event_store::{EventStoreExt, InMemoryEventStore};
    use tokio::sync::RwLock;

    /// A simple counting projection for testing.
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, position: u64, _event: &Event) -> Result<()> {
            let mut pos = self.position.write().await;
            if position <= pos.events_processed {
                return Ok(());
            }
            if position != pos.expected_next() {
                return Err(ProjectionError::Gap {
                    expected: pos.expected_next(),
                    actual: position,
                });
            }
            *self.count.write().await += 1;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    async fn store_with(count: u64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = OrderId::new(1).unwrap();
        store
            .append_event(Event::order_created(id, "alice", vec!["book".into()]))
            .await
            .unwrap();
        for _ in 1..count {
            store.append_event(Event::order_paid(id)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_catch_up_processes_all_events() {
        let store = store_with(3).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn test_process_single_event() {
        let store = InMemoryEventStore::new();
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        let event = Event::order_paid(OrderId::new(1).unwrap());
        processor.process_event(1, &event).await.unwrap();

        assert_eq!(*count_ref.read().await, 1);
    }

    #[tokio::test]
    async fn test_gap_triggers_catch_up() {
        let store = store_with(4).await;
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let pos_ref = Arc::clone(&projection.position);

        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(projection));

        // Notification for position 4 arrives while 1..=3 were never delivered.
        let events = store.all_events().await.unwrap();
        processor.process_event(4, &events[3]).await.unwrap();

        assert_eq!(*count_ref.read().await, 4);
        assert_eq!(*pos_ref.read().await, ProjectionPosition::at(4));
    }

    #[tokio::test]
    async fn test_rebuild_resets_and_replays() {
        let store = store_with(2).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let pos_ref = Arc::clone(&projection.position);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        // First catch-up
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);

        // Rebuild should reset and replay
        processor.rebuild_all().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
        assert_eq!(pos_ref.read().await.events_processed, 2);
    }

    #[tokio::test]
    async fn test_catch_up_skips_already_processed() {
        let store = store_with(3).await;

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);

        // Second catch-up should not re-process
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn test_empty_store_catch_up() {
        let store = InMemoryEventStore::new();
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 0);
    }

    #[tokio::test]
    async fn test_multiple_projections_at_different_positions() {
        let store = store_with(3).await;

        let proj1 = CountingProjection::new();
        let proj2 = CountingProjection::new();
        let count1 = Arc::clone(&proj1.count);
        let count2 = Arc::clone(&proj2.count);

        let events = store.all_events().await.unwrap();
        proj1.handle(1, &events[0]).await.unwrap();

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(proj1));
        processor.register(Box::new(proj2));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count1.read().await, 3);
        assert_eq!(*count2.read().await, 3);
    }

    #[tokio::test]
    async fn test_lag_report_catches_up_without_new_events() {
        let store = store_with(5).await;
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.on_lagged(5).await.unwrap();

        assert_eq!(*count_ref.read().await, 5);
    }
}
