//! Application error types with process exit code mapping.

use common::OrderId;
use domain::{DomainError, OrderError};
use event_store::EventStoreError;
use projections::ProjectionError;
use thiserror::Error;

/// Application-level error type that maps to process exit codes.
#[derive(Debug, Error)]
pub enum AppError {
    /// A command was rejected or failed in the domain layer.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The event store failed, e.g. a corrupt log at startup.
    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    /// The read model could not be brought up to date.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The requested order does not exist in the read model.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Observability could not be initialised.
    #[error("Setup error: {0}")]
    Setup(String),
}

impl AppError {
    /// Returns the process exit code for this error.
    ///
    /// - `2` invalid input
    /// - `3` order not found
    /// - `4` rejected by the order's current state or a concurrent writer
    /// - `5` storage failure, including a corrupt log
    /// - `1` anything else
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Domain(err) if err.is_validation() => 2,
            AppError::Domain(err) if err.is_not_found() => 3,
            AppError::NotFound(_) => 3,
            AppError::Domain(err) if err.is_conflict() => 4,
            AppError::Domain(DomainError::Order(OrderError::InvalidStateTransition { .. })) => 4,
            AppError::Domain(DomainError::EventStore(_)) | AppError::EventStore(_) => 5,
            AppError::Projection(ProjectionError::EventStore(_)) => 5,
            _ => 1,
        }
    }
}
