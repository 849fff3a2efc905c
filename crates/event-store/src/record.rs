//! On-disk record layout for the event log.
//!
//! Each event is one JSON object on its own line:
//!
//! ```text
//! {"type":"OrderCreated","order_id":1,"timestamp":"2024-05-01T10:00:00Z","data":{"customer_id":"c1","items":["x"]}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    Event, EventPayload, EventStoreError, OrderCancelledData, OrderCreatedData, OrderId,
    OrderPaidData, Result,
};

/// A single persisted event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Discriminator naming the event variant.
    #[serde(rename = "type")]
    pub event_type: String,

    /// The order the event belongs to.
    pub order_id: OrderId,

    /// RFC 3339 timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Variant-specific fields.
    pub data: serde_json::Value,
}

impl EventPayload {
    fn to_data(&self) -> serde_json::Value {
        match self {
            EventPayload::OrderCreated(data) => json!({
                "customer_id": data.customer_id,
                "items": data.items,
            }),
            EventPayload::OrderPaid(_) => json!({}),
            EventPayload::OrderCancelled(data) => json!({ "reason": data.reason }),
        }
    }
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            event_type: event.event_type().to_string(),
            order_id: event.order_id,
            timestamp: event.timestamp,
            data: event.payload.to_data(),
        }
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = EventStoreError;

    fn try_from(record: EventRecord) -> Result<Self> {
        if !record.order_id.is_valid() {
            return Err(EventStoreError::InvalidRecord(
                "order_id must be a positive integer".to_string(),
            ));
        }

        let payload = match record.event_type.as_str() {
            "OrderCreated" => {
                EventPayload::OrderCreated(serde_json::from_value::<OrderCreatedData>(record.data)?)
            }
            "OrderPaid" => {
                EventPayload::OrderPaid(serde_json::from_value::<OrderPaidData>(record.data)?)
            }
            "OrderCancelled" => EventPayload::OrderCancelled(serde_json::from_value::<
                OrderCancelledData,
            >(record.data)?),
            other => return Err(EventStoreError::UnknownEventType(other.to_string())),
        };

        Ok(Event::at(record.order_id, record.timestamp, payload))
    }
}

/// Encodes an event as one newline-terminated log line.
pub fn encode_line(event: &Event) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(&EventRecord::from(event))?;
    line.push(b'\n');
    Ok(line)
}

/// Decodes one log line (without its newline) back into an event.
pub fn decode_line(line: &str) -> Result<Event> {
    let record: EventRecord = serde_json::from_str(line)?;
    Event::try_from(record)
}
