//! Read models and projections for the query side.
//!
//! This crate provides:
//! - [`Projection`] trait for processing positioned events into read models
//! - [`ProjectionProcessor`] for feeding events from the store to projections,
//!   both by catch-up and as a live subscriber
//! - [`OrderProjection`], the current state of every order

pub mod error;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use views::OrderProjection;
