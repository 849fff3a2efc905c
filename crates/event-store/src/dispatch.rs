//! Asynchronous delivery of appended events to subscribers.
//!
//! Appends hand each event to a bounded channel drained by a single worker
//! task, so delivery happens in append order and never blocks the writer.
//! When the channel is full the notification is dropped and counted, and the
//! highest dropped position is remembered. The worker then tells every
//! subscriber it lagged behind that position, so a drop is always followed by
//! a catch-up signal even if nothing is ever appended again.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::Event;

/// Default number of notifications buffered between writer and worker.
pub const DEFAULT_DISPATCH_CAPACITY: usize = 1024;

/// An appended event together with its position in the log.
#[derive(Debug, Clone)]
pub struct Notification {
    /// 1-based position of the event in the global append order.
    pub position: u64,

    /// The appended event.
    pub event: Event,
}

/// Error reported by a subscriber. Logged by the dispatcher, never surfaced
/// to the appender.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// A handler invoked once for every event appended after it subscribed.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns the name used in logs.
    fn name(&self) -> &'static str;

    /// Handles one appended event.
    async fn on_event(&self, notification: &Notification) -> Result<(), SubscriberError>;

    /// Called after notifications up to and including `position` were
    /// dropped. Subscribers that must see every event re-read them from the
    /// store here.
    async fn on_lagged(&self, position: u64) -> Result<(), SubscriberError> {
        tracing::debug!(subscriber = self.name(), position, "notifications missed");
        Ok(())
    }
}

type Subscribers = Arc<RwLock<Vec<Arc<dyn EventSubscriber>>>>;

/// Highest dropped position not yet reported to subscribers, plus the wake-up
/// for an idle worker.
#[derive(Default)]
struct Lag {
    position: AtomicU64,
    wake: Notify,
}

impl Lag {
    fn record(&self, position: u64) {
        self.position.fetch_max(position, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn take(&self) -> Option<u64> {
        match self.position.swap(0, Ordering::SeqCst) {
            0 => None,
            position => Some(position),
        }
    }
}

/// Fan-out of appended events to registered subscribers.
pub struct Dispatcher {
    capacity: usize,
    subscribers: Subscribers,
    lag: Arc<Lag>,
    sender: OnceLock<mpsc::Sender<Notification>>,
}

impl Dispatcher {
    /// Creates a dispatcher buffering up to `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            lag: Arc::new(Lag::default()),
            sender: OnceLock::new(),
        }
    }

    /// Registers a subscriber. The worker task is started on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        tracing::debug!(subscriber = subscriber.name(), "subscriber registered");
        self.subscribers.write().await.push(subscriber);
        self.sender.get_or_init(|| {
            let (tx, rx) = mpsc::channel(self.capacity);
            tokio::spawn(run_worker(
                rx,
                Arc::clone(&self.subscribers),
                Arc::clone(&self.lag),
            ));
            tx
        });
    }

    /// Queues a notification without waiting.
    pub fn publish(&self, notification: Notification) {
        let Some(sender) = self.sender.get() else {
            return;
        };

        match sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(notification)) => {
                metrics::counter!("event_dispatch_dropped_total").increment(1);
                tracing::warn!(
                    position = notification.position,
                    order_id = %notification.event.order_id,
                    capacity = self.capacity,
                    "dispatch queue full, notification dropped"
                );
                self.lag.record(notification.position);
            }
            Err(TrySendError::Closed(notification)) => {
                tracing::warn!(
                    position = notification.position,
                    "dispatch worker stopped, notification dropped"
                );
            }
        }
    }

    /// Returns the number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DISPATCH_CAPACITY)
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Notification>,
    subscribers: Subscribers,
    lag: Arc<Lag>,
) {
    loop {
        tokio::select! {
            biased;
            received = rx.recv() => {
                let Some(notification) = received else {
                    break;
                };
                let targets = subscribers.read().await.clone();
                for subscriber in targets {
                    deliver(
                        subscriber.as_ref(),
                        notification.position,
                        subscriber.on_event(&notification),
                    )
                    .await;
                }
            }
            () = lag.wake.notified() => {}
        }

        // A drop recorded after this check leaves a stored wake-up, so the
        // next loop iteration reports it.
        if let Some(position) = lag.take() {
            let targets = subscribers.read().await.clone();
            for subscriber in targets {
                deliver(subscriber.as_ref(), position, subscriber.on_lagged(position)).await;
            }
        }
    }
    tracing::debug!("dispatch worker stopped");
}

async fn deliver(
    subscriber: &dyn EventSubscriber,
    position: u64,
    handled: impl Future<Output = Result<(), SubscriberError>>,
) {
    match AssertUnwindSafe(handled).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            metrics::counter!("event_subscriber_failures_total").increment(1);
            tracing::warn!(
                subscriber = subscriber.name(),
                position,
                error = %e,
                "subscriber failed to handle event"
            );
        }
        Err(_) => {
            metrics::counter!("event_subscriber_failures_total").increment(1);
            tracing::error!(
                subscriber = subscriber.name(),
                position,
                "subscriber panicked while handling event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Mutex;

    use super::*;
    use crate::OrderId;

    struct Recording {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    #[async_trait]
    impl EventSubscriber for Recording {
        fn name(&self) -> &'static str {
            "Recording"
        }

        async fn on_event(&self, notification: &Notification) -> Result<(), SubscriberError> {
            self.seen.lock().await.push(notification.position);
            Ok(())
        }
    }

    /// Records delivered positions and lag reports separately.
    #[derive(Default)]
    struct LagAware {
        seen: Arc<Mutex<Vec<u64>>>,
        lagged: Arc<Mutex<Vec<u64>>>,
    }

    #[async_trait]
    impl EventSubscriber for LagAware {
        fn name(&self) -> &'static str {
            "LagAware"
        }

        async fn on_event(&self, notification: &Notification) -> Result<(), SubscriberError> {
            self.seen.lock().await.push(notification.position);
            Ok(())
        }

        async fn on_lagged(&self, position: u64) -> Result<(), SubscriberError> {
            self.lagged.lock().await.push(position);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventSubscriber for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn on_event(&self, _notification: &Notification) -> Result<(), SubscriberError> {
            Err(SubscriberError::new("boom"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl EventSubscriber for Panicking {
        fn name(&self) -> &'static str {
            "Panicking"
        }

        async fn on_event(&self, _notification: &Notification) -> Result<(), SubscriberError> {
            panic!("subscriber bug");
        }
    }

    fn notification(position: u64) -> Notification {
        Notification {
            position,
            event: Event::order_paid(OrderId::new(1).unwrap()),
        }
    }

    async fn wait_for_len(seen: &Arc<Mutex<Vec<u64>>>, len: usize) {
        for _ in 0..200 {
            if seen.lock().await.len() >= len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {len} notifications");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let dispatcher = Dispatcher::default();
        dispatcher.publish(notification(1));
        assert_eq!(dispatcher.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let dispatcher = Dispatcher::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .subscribe(Arc::new(Recording { seen: seen.clone() }))
            .await;

        for position in 1..=5 {
            dispatcher.publish(notification(position));
        }

        wait_for_len(&seen, 5).await;
        assert_eq!(*seen.lock().await, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn failing_and_panicking_subscribers_do_not_stop_delivery() {
        let dispatcher = Dispatcher::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher.subscribe(Arc::new(Failing)).await;
        dispatcher.subscribe(Arc::new(Panicking)).await;
        dispatcher
            .subscribe(Arc::new(Recording { seen: seen.clone() }))
            .await;

        dispatcher.publish(notification(1));
        dispatcher.publish(notification(2));

        wait_for_len(&seen, 2).await;
        assert_eq!(*seen.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn full_queue_reports_highest_dropped_position() {
        let dispatcher = Dispatcher::new(1);
        let subscriber = Arc::new(LagAware::default());
        let seen = subscriber.seen.clone();
        let lagged = subscriber.lagged.clone();
        dispatcher.subscribe(subscriber).await;

        // The worker cannot run until this task yields, so only the first
        // notification fits in the queue.
        for position in 1..=20 {
            dispatcher.publish(notification(position));
        }

        wait_for_len(&lagged, 1).await;
        assert_eq!(*seen.lock().await, vec![1]);
        assert_eq!(*lagged.lock().await, vec![20]);
    }

    #[tokio::test]
    async fn lag_is_reported_to_idle_worker() {
        let dispatcher = Dispatcher::new(1);
        let subscriber = Arc::new(LagAware::default());
        let seen = subscriber.seen.clone();
        let lagged = subscriber.lagged.clone();
        dispatcher.subscribe(subscriber).await;

        dispatcher.publish(notification(1));
        wait_for_len(&seen, 1).await;

        dispatcher.publish(notification(2));
        dispatcher.publish(notification(3));
        wait_for_len(&lagged, 1).await;

        assert_eq!(*seen.lock().await, vec![1, 2]);
        assert_eq!(*lagged.lock().await, vec![3]);
    }
}
