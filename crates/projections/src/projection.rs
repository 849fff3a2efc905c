//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::Event;

use crate::Result;

/// Tracks the last log position a projection has applied.
///
/// Positions are 1-based, so a fresh projection sits at zero and expects
/// position 1 next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    /// Number of events processed by this projection, which is also the
    /// position of the last one.
    pub events_processed: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self {
            events_processed: 0,
        }
    }

    /// Creates a position after `events_processed` events.
    pub fn at(events_processed: u64) -> Self {
        Self { events_processed }
    }

    /// Advances the position by one event.
    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }

    /// Returns the log position this projection expects next.
    pub fn expected_next(&self) -> u64 {
        self.events_processed + 1
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_processed)
    }
}

/// A projection that processes events and updates a read model.
///
/// Projections are the mechanism by which events are transformed into
/// denormalized read models optimized for queries.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles the event found at `position` in the log.
    ///
    /// Positions at or below the current one are ignored. A position past
    /// the next expected one fails with `Gap` and leaves the projection
    /// unchanged.
    async fn handle(&self, position: u64, event: &Event) -> Result<()>;

    /// Returns the current position of this projection.
    async fn position(&self) -> ProjectionPosition;

    /// Resets the projection to its initial state.
    async fn reset(&self) -> Result<()>;
}
