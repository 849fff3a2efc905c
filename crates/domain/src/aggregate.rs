//! Core aggregate trait.

use common::OrderId;
use event_store::{Event, Version};

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Generate events from commands
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Send + Sync + Sized {
    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name, used in logs.
    fn aggregate_type() -> &'static str;

    /// Creates the empty aggregate for `id`, before any event.
    fn empty(id: OrderId) -> Self;

    /// Returns true once the aggregate has been created by an event.
    fn exists(&self) -> bool;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 for a new aggregate and increments with each event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and must not fail: events represent facts that have
    /// happened.
    fn apply(&mut self, event: &Event);

    /// Applies multiple events in sequence.
    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
