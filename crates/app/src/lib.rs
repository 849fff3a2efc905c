//! Application wiring for the order system.
//!
//! [`OrderApp`] owns the event store, the command service and the order
//! projection, and keeps the projection subscribed to new appends. The
//! `orders` binary is a thin clap front end over it.

pub mod cli;
pub mod config;
pub mod error;

use std::sync::Arc;

use common::OrderId;
use domain::{CancelOrder, CreateOrder, OrderService, OrderState, PayOrder};
use event_store::{Event, EventStore, LogEventStore};
use projections::{OrderProjection, ProjectionProcessor};

pub use config::{Config, Consistency};
pub use error::AppError;

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// The assembled order system: write side, read side and the subscription
/// between them.
pub struct OrderApp<S: EventStore + Clone + 'static> {
    service: OrderService<S>,
    view: OrderProjection,
    processor: Arc<ProjectionProcessor<S>>,
    consistency: Consistency,
}

impl OrderApp<LogEventStore> {
    /// Opens the log at `config.log_path`, replays it and starts the projection.
    ///
    /// Fails with a corrupt-log error if any persisted record cannot be decoded.
    pub async fn open(config: &Config) -> Result<Self> {
        let store =
            LogEventStore::open_with_capacity(&config.log_path, config.dispatch_capacity).await?;
        Self::with_store(store, config.consistency).await
    }
}

impl<S: EventStore + Clone + 'static> OrderApp<S> {
    /// Wires an existing store to a fresh projection and catches it up.
    pub async fn with_store(store: S, consistency: Consistency) -> Result<Self> {
        let view = OrderProjection::new();
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(view.clone()));
        let processor = Arc::new(processor).start().await?;

        tracing::info!(?consistency, orders = view.count().await, "order app ready");

        Ok(Self {
            service: OrderService::new(store),
            view,
            processor,
            consistency,
        })
    }

    /// Creates an order and returns its identifier.
    pub async fn create_order(
        &self,
        customer_id: impl Into<String>,
        items: Vec<String>,
    ) -> Result<OrderId> {
        let result = self
            .service
            .create_order(CreateOrder::new(customer_id, items))
            .await?;
        self.settle().await?;
        Ok(result.aggregate.id())
    }

    /// Marks an order as paid.
    pub async fn pay_order(&self, order_id: OrderId) -> Result<()> {
        self.service.pay_order(PayOrder::new(order_id)).await?;
        self.settle().await
    }

    /// Cancels an order. A blank reason is recorded as the default reason.
    pub async fn cancel_order(&self, order_id: OrderId, reason: impl Into<String>) -> Result<()> {
        self.service
            .cancel_order(CancelOrder::new(order_id, reason))
            .await?;
        self.settle().await
    }

    /// Reads one order from the projection.
    pub async fn get_order(&self, order_id: OrderId) -> Option<OrderState> {
        self.view.get_order(order_id).await
    }

    /// Reads every order from the projection, ordered by identifier.
    pub async fn get_all_orders(&self) -> Vec<OrderState> {
        let mut orders = self.view.get_all_orders().await;
        orders.sort_by_key(|order| order.id);
        orders
    }

    /// Returns the full event history in append order.
    pub async fn get_all_events(&self) -> Result<Vec<Event>> {
        Ok(self.service.store().all_events().await?)
    }

    /// Brings the projection up to date with the store.
    pub async fn catch_up(&self) -> Result<()> {
        Ok(self.processor.run_catch_up().await?)
    }

    pub fn projection(&self) -> &OrderProjection {
        &self.view
    }

    pub fn store(&self) -> &S {
        self.service.store()
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    async fn settle(&self) -> Result<()> {
        match self.consistency {
            Consistency::Strong => self.catch_up().await,
            Consistency::Eventual => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DomainError, OrderError, OrderStatus};
    use event_store::InMemoryEventStore;

    async fn app() -> OrderApp<InMemoryEventStore> {
        OrderApp::with_store(InMemoryEventStore::new(), Consistency::Strong)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reads_observe_own_writes() {
        let app = app().await;

        let id = app.create_order("alice", vec!["book".into()]).await.unwrap();
        assert_eq!(app.get_order(id).await.unwrap().status, OrderStatus::Created);

        app.pay_order(id).await.unwrap();
        assert_eq!(app.get_order(id).await.unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_rejected_command_surfaces_domain_error() {
        let app = app().await;

        let err = app.create_order("", vec!["book".into()]).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Order(OrderError::CustomerIdRequired))
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(app.get_all_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_all_orders_sorted_by_id() {
        let app = app().await;
        for customer in ["c", "b", "a"] {
            app.create_order(customer, vec!["x".into()]).await.unwrap();
        }

        let ids: Vec<u64> = app
            .get_all_orders()
            .await
            .iter()
            .map(|o| o.id.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
