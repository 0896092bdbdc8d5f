//! Tap events
//!
//! A `LogEvent` is the unit the tap publishes: the serialized text of one
//! message plus the direction it was travelling in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a tapped message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Request received by the host, before the operation runs
    Inbound,
    /// Reply produced by the operation, before it is sent
    Outbound,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inbound" | "in" | "request" => Some(Self::Inbound),
            "outbound" | "out" | "reply" => Some(Self::Outbound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observed message. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    message: String,
    direction: Direction,
    endpoint: Option<String>,
    observed_at: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, direction: Direction) -> Self {
        Self {
            message: message.into(),
            direction,
            endpoint: None,
            observed_at: Utc::now(),
        }
    }

    pub fn inbound(message: impl Into<String>) -> Self {
        Self::new(message, Direction::Inbound)
    }

    pub fn outbound(message: impl Into<String>) -> Self {
        Self::new(message, Direction::Outbound)
    }

    /// Tag the event with the endpoint whose pipeline produced it
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Serialized text of the message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::Inbound
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_event() {
        let event = LogEvent::inbound("REQ");
        assert_eq!(event.message(), "REQ");
        assert!(event.is_inbound());
        assert_eq!(event.direction(), Direction::Inbound);
        assert!(event.endpoint().is_none());
    }

    #[test]
    fn test_outbound_event_with_endpoint() {
        let event = LogEvent::outbound("RESP").with_endpoint("orders/basic");
        assert!(!event.is_inbound());
        assert_eq!(event.endpoint(), Some("orders/basic"));
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!(Direction::from_str("Inbound"), Some(Direction::Inbound));
        assert_eq!(Direction::from_str("reply"), Some(Direction::Outbound));
        assert_eq!(Direction::from_str("sideways"), None);
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&Direction::Outbound).unwrap();
        assert_eq!(json, "\"outbound\"");
    }
}
