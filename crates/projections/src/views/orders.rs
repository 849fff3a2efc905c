//! Orders read model: the current state of every order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::OrderState;
use event_store::Event;
use tokio::sync::{Mutex, RwLock, watch};

use crate::projection::{Projection, ProjectionPosition};
use crate::{ProjectionError, Result};

type OrderEntry = Arc<RwLock<OrderState>>;

/// Read model holding the folded state of every order.
///
/// Each order sits behind its own lock, so readers of one order never wait
/// on updates to another. The outer map is write-locked only when a new
/// order appears. Writers are serialized by an apply lock so positions are
/// applied strictly in order.
#[derive(Clone)]
pub struct OrderProjection {
    orders: Arc<RwLock<HashMap<OrderId, OrderEntry>>>,
    apply_lock: Arc<Mutex<()>>,
    position: Arc<watch::Sender<u64>>,
}

impl OrderProjection {
    /// Creates a new empty projection.
    pub fn new() -> Self {
        let (position, _) = watch::channel(0);
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            apply_lock: Arc::new(Mutex::new(())),
            position: Arc::new(position),
        }
    }

    /// Gets the current state of an order.
    pub async fn get_order(&self, order_id: OrderId) -> Option<OrderState> {
        let entry = self.orders.read().await.get(&order_id).cloned()?;
        let state = entry.read().await.clone();
        Some(state)
    }

    /// Gets every order. No particular order is guaranteed.
    pub async fn get_all_orders(&self) -> Vec<OrderState> {
        let entries: Vec<OrderEntry> = self.orders.read().await.values().cloned().collect();

        let mut states = Vec::with_capacity(entries.len());
        for entry in entries {
            states.push(entry.read().await.clone());
        }
        states
    }

    /// Returns the number of orders in the projection.
    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Waits until the projection has applied `position`.
    pub async fn wait_for_position(&self, position: u64) {
        let mut rx = self.position.subscribe();
        // The sender lives as long as self, so this cannot fail.
        let _ = rx.wait_for(|applied| *applied >= position).await;
    }

    /// Replaces the whole projection with the fold of `events`, taken to be
    /// the complete log in append order.
    pub async fn rebuild(&self, events: &[Event]) {
        let _guard = self.apply_lock.lock().await;

        let mut folded: HashMap<OrderId, OrderState> = HashMap::new();
        for event in events {
            folded
                .entry(event.order_id)
                .or_insert_with(|| OrderState::new(event.order_id))
                .apply(event);
        }

        let rebuilt = folded
            .into_iter()
            .map(|(id, state)| (id, Arc::new(RwLock::new(state))))
            .collect();
        *self.orders.write().await = rebuilt;
        self.position.send_replace(events.len() as u64);

        tracing::info!(events = events.len(), "order projection rebuilt");
    }

    async fn entry(&self, order_id: OrderId) -> OrderEntry {
        if let Some(entry) = self.orders.read().await.get(&order_id) {
            return Arc::clone(entry);
        }

        let mut orders = self.orders.write().await;
        Arc::clone(
            orders
                .entry(order_id)
                .or_insert_with(|| Arc::new(RwLock::new(OrderState::new(order_id)))),
        )
    }
}

impl Default for OrderProjection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for OrderProjection {
    fn name(&self) -> &'static str {
        "OrderProjection"
    }

    async fn handle(&self, position: u64, event: &Event) -> Result<()> {
        let _guard = self.apply_lock.lock().await;

        let current = *self.position.borrow();
        if position <= current {
            tracing::trace!(position, current, "event already applied, skipping");
            return Ok(());
        }
        if position != current + 1 {
            return Err(ProjectionError::Gap {
                expected: current + 1,
                actual: position,
            });
        }

        let entry = self.entry(event.order_id).await;
        entry.write().await.apply(event);
        self.position.send_replace(position);

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        ProjectionPosition::at(*self.position.borrow())
    }

    async fn reset(&self) -> Result<()> {
        let _guard = self.apply_lock.lock().await;
        self.orders.write().await.clear();
        self.position.send_replace(0);
        Ok(())
    }
}
