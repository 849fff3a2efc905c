pub mod dispatch;
pub mod error;
pub mod event;
pub mod file;
pub mod history;
pub mod log;
pub mod memory;
pub mod record;
pub mod store;

pub use common::OrderId;
pub use dispatch::{
    DEFAULT_DISPATCH_CAPACITY, Dispatcher, EventSubscriber, Notification, SubscriberError,
};
pub use error::{EventStoreError, Result};
pub use event::{
    Event, EventPayload, OrderCancelledData, OrderCreatedData, OrderPaidData, Version,
};
pub use file::LogEventStore;
pub use history::EventHistory;
pub use log::EventLog;
pub use memory::InMemoryEventStore;
pub use record::EventRecord;
pub use store::{AppendOptions, AppendReceipt, EventStore, EventStoreExt, OrderIdCounter};
