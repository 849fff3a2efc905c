//! Durable, append-only event log stored as newline-delimited JSON.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};

use crate::dispatch::{DEFAULT_DISPATCH_CAPACITY, Dispatcher, EventSubscriber, Notification};
use crate::history::EventHistory;
use crate::record::{decode_line, encode_line};
use crate::store::OrderIdCounter;
use crate::{AppendOptions, AppendReceipt, Event, EventStoreError, OrderId, Result, Version};

/// Write half of the log. Held under the append lock.
struct LogWriter {
    file: File,
    len: u64,
}

impl LogWriter {
    async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }

    /// Writes one record and syncs it to disk. On failure the file is cut
    /// back to its previous length so a torn record is not left behind.
    async fn write_record(&mut self, line: &[u8]) -> std::io::Result<()> {
        let written = async {
            self.file.write_all(line).await?;
            self.file.flush().await?;
            self.file.sync_data().await
        }
        .await;

        match written {
            Ok(()) => {
                self.len += line.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(truncate_err) = self.file.set_len(self.len).await {
                    tracing::error!(
                        error = %truncate_err,
                        len = self.len,
                        "failed to truncate event log after write error"
                    );
                }
                Err(e)
            }
        }
    }
}

/// File-backed event log.
///
/// Every append is written and synced as one JSON line before it becomes
/// visible to readers. An in-memory mirror serves reads, so readers never
/// wait on disk I/O. Order identifiers resume after the highest identifier
/// found in the file, so they are never reused across restarts.
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    history: RwLock<EventHistory>,
    counter: OrderIdCounter,
    dispatcher: Dispatcher,
}

impl EventLog {
    /// Opens the log at `path`, replaying any existing records.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_DISPATCH_CAPACITY).await
    }

    /// Opens the log with a custom subscriber dispatch capacity.
    pub async fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let events = Self::load_all(&path).await?;
        tracing::info!(
            path = %path.display(),
            events = events.len(),
            "event log loaded"
        );

        let writer = LogWriter::open(&path).await?;
        let history = EventHistory::from_events(events);
        let counter = OrderIdCounter::starting_after(history.max_order_id());
        tracing::debug!(last_order_id = counter.current(), "order id counter restored");

        Ok(Self {
            path,
            writer: Mutex::new(writer),
            history: RwLock::new(history),
            counter,
            dispatcher: Dispatcher::new(capacity),
        })
    }

    /// Reads every record at `path` in file order.
    ///
    /// A missing file is an empty history. Any record that cannot be decoded
    /// fails with `CorruptLog` naming its 1-based line.
    pub async fn load_all(path: impl AsRef<Path>) -> Result<Vec<Event>> {
        let file = match File::open(path.as_ref()).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        let mut line_no = 0;

        loop {
            line_no += 1;
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(EventStoreError::CorruptLog {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            if line.trim().is_empty() {
                continue;
            }

            let event = decode_line(&line).map_err(|e| EventStoreError::CorruptLog {
                line: line_no,
                reason: e.to_string(),
            })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Returns the path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocates a fresh order identifier.
    pub fn next_order_id(&self) -> Result<OrderId> {
        self.counter.next().ok_or(EventStoreError::OrderIdsExhausted)
    }

    /// Appends an event durably and notifies subscribers.
    ///
    /// Appends are fully serialized. Subscribers are notified after the
    /// record is synced, without waiting for them.
    pub async fn append(&self, event: Event, options: AppendOptions) -> Result<AppendReceipt> {
        let mut writer = self.writer.lock().await;

        self.history
            .read()
            .await
            .check_append(event.order_id, &options)?;
        self.counter.observe(event.order_id);

        let line = encode_line(&event)?;
        let started = Instant::now();
        writer.write_record(&line).await?;
        metrics::histogram!("event_log_append_seconds").record(started.elapsed().as_secs_f64());

        let receipt = self.history.write().await.push(event.clone());
        metrics::counter!("event_store_events_appended_total").increment(1);

        tracing::debug!(
            position = receipt.position,
            order_id = %event.order_id,
            event_type = event.event_type(),
            "event appended"
        );

        self.dispatcher.publish(Notification {
            position: receipt.position,
            event,
        });

        Ok(receipt)
    }

    /// Registers a subscriber for all future appends.
    pub async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.dispatcher.subscribe(subscriber).await;
    }

    /// Returns a snapshot of every event in append order.
    pub async fn all_events(&self) -> Vec<Event> {
        self.history.read().await.all()
    }

    /// Returns a snapshot of one order's events in append order.
    pub async fn events_for_order(&self, order_id: OrderId) -> Vec<Event> {
        self.history.read().await.for_order(order_id)
    }

    /// Returns the events after `position`.
    pub async fn events_after(&self, position: u64) -> Vec<Event> {
        self.history.read().await.after(position)
    }

    /// Returns the current version of an order.
    pub async fn version_of(&self, order_id: OrderId) -> Version {
        self.history.read().await.version_of(order_id)
    }

    /// Returns the highest order ID present in the log.
    pub async fn max_order_id(&self) -> Option<OrderId> {
        self.history.read().await.max_order_id()
    }

    /// Returns the number of events in the log.
    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    /// Returns true if the log holds no events.
    pub async fn is_empty(&self) -> bool {
        self.history.read().await.is_empty()
    }
}
