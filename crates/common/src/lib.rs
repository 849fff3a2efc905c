//! Shared types for the order event-sourcing core.

pub mod types;

pub use types::{OrderId, ParseOrderIdError};
