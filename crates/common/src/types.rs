use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an order aggregate.
///
/// Order identifiers are positive integers handed out by the event store
/// in increasing order. Zero is never a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    /// Creates an order ID from a raw value.
    ///
    /// Returns `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns the identifier that follows a raw counter value, or `None`
    /// once the identifier space is exhausted.
    pub fn after(last: u64) -> Option<Self> {
        last.checked_add(1).map(Self)
    }

    /// Returns the raw identifier value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if this is a usable identifier (non-zero).
    ///
    /// Deserialized values bypass [`OrderId::new`], so decoders call this.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OrderId> for u64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl TryFrom<u64> for OrderId {
    type Error = ParseOrderIdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ParseOrderIdError::Zero)
    }
}

/// Error returned when an order ID cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseOrderIdError {
    #[error("order id must be a positive integer, got {0:?}")]
    Invalid(String),

    #[error("order id must be greater than zero")]
    Zero,
}

impl FromStr for OrderId {
    type Err = ParseOrderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| ParseOrderIdError::Invalid(s.to_string()))?;
        Self::try_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_rejects_zero() {
        assert!(OrderId::new(0).is_none());
        assert_eq!(OrderId::try_from(0), Err(ParseOrderIdError::Zero));
    }

    #[test]
    fn order_id_ordering_follows_value() {
        let a = OrderId::new(1).unwrap();
        let b = OrderId::new(2).unwrap();
        assert!(a < b);
        assert_eq!(a.as_u64(), 1);
    }

    #[test]
    fn order_id_after_stops_at_max() {
        assert_eq!(OrderId::after(0), OrderId::new(1));
        assert_eq!(OrderId::after(u64::MAX - 1), OrderId::new(u64::MAX));
        assert_eq!(OrderId::after(u64::MAX), None);
    }

    #[test]
    fn order_id_parses_from_str() {
        assert_eq!("42".parse::<OrderId>().unwrap().as_u64(), 42);
        assert!(matches!(
            "abc".parse::<OrderId>(),
            Err(ParseOrderIdError::Invalid(_))
        ));
        assert_eq!("0".parse::<OrderId>(), Err(ParseOrderIdError::Zero));
    }

    #[test]
    fn order_id_serializes_as_plain_integer() {
        let id = OrderId::new(7).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
