//! Domain layer for the order event-sourcing core.
//!
//! This crate provides:
//! - Aggregate trait for event-sourced entities
//! - CommandHandler with optimistic concurrency on append
//! - Order aggregate, its status machine and the OrderState fold

pub mod aggregate;
pub mod command;
pub mod error;
pub mod order;

pub use aggregate::Aggregate;
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use order::{
    CancelOrder, CreateOrder, DEFAULT_CANCEL_REASON, Order, OrderError, OrderService, OrderState,
    OrderStatus, PayOrder,
};
