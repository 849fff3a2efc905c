//! Command handling infrastructure.

use std::marker::PhantomData;

use common::OrderId;
use event_store::{AppendOptions, Event, EventStore, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,

    /// Global log position of the last persisted event, if any were written.
    pub position: Option<u64>,
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate by folding its events from the store
/// 2. Executing the command to produce events
/// 3. Persisting the events with an expected-version check
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate has no events, returns its empty instance.
    pub async fn load(&self, order_id: OrderId) -> Result<A, DomainError> {
        let events = self.store.events_for_order(order_id).await?;

        let mut aggregate = A::empty(order_id);
        aggregate.apply_events(&events);
        aggregate.set_version(Version::new(events.len() as u64));

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it has no events.
    pub async fn load_existing(&self, order_id: OrderId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(order_id).await?;
        if aggregate.version() != Version::initial() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. Events are appended
    /// expecting the version the aggregate was loaded at, so a concurrent
    /// writer makes this call fail with `ConcurrencyConflict`.
    pub async fn execute<F>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(order_id).await?;
        self.run(aggregate, command_fn).await
    }

    /// Like [`execute`](Self::execute), but fails with `OrderNotFound` when
    /// the aggregate has no events yet.
    pub async fn execute_existing<F>(
        &self,
        order_id: OrderId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(order_id).await?;
        if aggregate.version() == Version::initial() {
            return Err(DomainError::OrderNotFound(order_id));
        }
        self.run(aggregate, command_fn).await
    }

    async fn run<F>(
        &self,
        mut aggregate: A,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();

        // Execute command to get events
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
                position: None,
            });
        }

        let mut version = current_version;
        let mut position = None;

        for event in &events {
            let options = if version == Version::initial() {
                AppendOptions::expect_new()
            } else {
                AppendOptions::expect_version(version)
            };

            let receipt = self.store.save_event(event.clone(), options).await?;
            tracing::debug!(
                aggregate_type = A::aggregate_type(),
                order_id = %event.order_id,
                event_type = event.event_type(),
                version = %receipt.version,
                "event persisted"
            );

            aggregate.apply(event);
            version = receipt.version;
            position = Some(receipt.position);
        }
        aggregate.set_version(version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version: version,
            position,
        })
    }
}
