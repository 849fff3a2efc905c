//! Read model views for the query side.

pub mod orders;

pub use orders::OrderProjection;
