//! Order service providing a simplified API for order operations.

use common::OrderId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{CancelOrder, CreateOrder, Order, OrderState, PayOrder};

impl From<super::OrderError> for DomainError {
    fn from(e: super::OrderError) -> Self {
        DomainError::Order(e)
    }
}

fn record_outcome<T>(command: &'static str, result: &Result<T, DomainError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) if e.is_validation() => "invalid",
        Err(e) if e.is_not_found() => "not_found",
        Err(e) if e.is_conflict() => "conflict",
        Err(DomainError::Order(_)) => "rejected",
        Err(_) => "error",
    };
    metrics::counter!("orders_commands_total", "command" => command, "outcome" => outcome)
        .increment(1);

    if let Err(e) = result {
        tracing::info!(command, outcome, error = %e, "command rejected");
    }
}

/// Service for managing orders.
///
/// Provides a high-level API for order operations, wrapping the command handler.
/// The store allocates identifiers; business rules live in [`Order`].
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        self.handler.store()
    }

    /// Creates a new order.
    ///
    /// Input is validated before an identifier is allocated, so a rejected
    /// command neither consumes an ID nor writes an event.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        cmd: CreateOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self.try_create_order(cmd).await;
        record_outcome("create", &result);
        result
    }

    async fn try_create_order(
        &self,
        cmd: CreateOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        cmd.validate()?;

        let order_id = self.store().next_order_id()?;
        tracing::debug!(%order_id, "order id allocated");

        let CreateOrder { customer_id, items } = cmd;
        self.handler
            .execute(order_id, |order| order.create(customer_id, items))
            .await
    }

    /// Pays for an existing order.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(&self, cmd: PayOrder) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .handler
            .execute_existing(cmd.order_id, |order| order.pay())
            .await;
        record_outcome("pay", &result);
        result
    }

    /// Cancels an existing order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        cmd: CancelOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let reason = cmd.effective_reason().to_string();

        let result = self
            .handler
            .execute_existing(cmd.order_id, |order| order.cancel(reason))
            .await;
        record_outcome("cancel", &result);
        result
    }

    /// Reconstructs an order's state from the store.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderState>, DomainError> {
        Ok(self
            .handler
            .load_existing(order_id)
            .await?
            .map(Order::into_state))
    }
}
