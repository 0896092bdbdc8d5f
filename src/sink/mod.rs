//! Observers that write tap events out
//!
//! - File (JSONL) - appends to `<path>/YYYY-MM/YYYY-MM-DD.jsonl`
//! - Stdout - prints formatted events
//! - HTTP - POSTs events to the configured endpoint

use chrono::Local;
use colored::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod file;
pub mod http;
pub mod stdout;

pub use file::FileSink;
pub use http::HttpSink;
pub use stdout::StdoutSink;

use crate::broadcast::Observer;
use crate::config::{Config, SinkConfig, SinkKind};
use crate::event::{Direction, LogEvent};

/// Serialized form of a tap event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapRecord {
    /// Timestamp (UTC ISO 8601)
    pub timestamp: String,
    /// Local time for display
    pub local_time: String,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Message length in bytes
    pub size: usize,
    /// Message text (optional, can be large)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TapRecord {
    pub fn from_event(event: &LogEvent, include_message: bool) -> Self {
        let observed = event.observed_at();

        Self {
            timestamp: observed.to_rfc3339(),
            local_time: observed.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            direction: event.direction(),
            endpoint: event.endpoint().map(|s| s.to_string()),
            size: event.message().len(),
            message: if include_message {
                Some(event.message().to_string())
            } else {
                None
            },
        }
    }

    /// Format for stdout display
    pub fn format_display(&self) -> String {
        let direction = match self.direction {
            Direction::Inbound => "→ inbound ".cyan(),
            Direction::Outbound => "← outbound".blue(),
        };

        let mut parts = vec![self.local_time.dimmed().to_string(), direction.to_string()];

        if let Some(ref endpoint) = self.endpoint {
            parts.push(endpoint.bold().to_string());
        }

        parts.push(format!("({} bytes)", self.size).dimmed().to_string());

        parts.join(" ")
    }

    /// Whether the record matches a `observe --filter` term
    ///
    /// `inbound` and `outbound` select a direction, as does `dir:<direction>`
    /// with any alias `Direction::from_str` accepts. Any other term matches
    /// endpoint names containing it.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        if let Some(alias) = filter.strip_prefix("dir:") {
            return Direction::from_str(alias) == Some(self.direction);
        }
        if filter == Direction::Inbound.as_str() || filter == Direction::Outbound.as_str() {
            return self.direction.as_str() == filter;
        }
        self.endpoint
            .as_ref()
            .map(|e| e.to_lowercase().contains(&filter))
            .unwrap_or(false)
    }
}

/// Build the observers the `sinks` config section asks for
pub fn sinks_from_config(config: &SinkConfig) -> Vec<Arc<dyn Observer>> {
    if !config.enabled {
        return Vec::new();
    }

    let mut sinks: Vec<Arc<dyn Observer>> = Vec::new();
    for kind in &config.sinks {
        match kind {
            SinkKind::File => {
                let path = Config::expand_path(&config.path);
                sinks.push(Arc::new(FileSink::new(path, config.include_message)));
            }
            SinkKind::Stdout => {
                sinks.push(Arc::new(StdoutSink::new(config.include_message)));
            }
            SinkKind::Http => match config.http_endpoint.as_ref() {
                Some(endpoint) => sinks.push(Arc::new(HttpSink::new(endpoint.clone(), config.include_message))),
                None => log::warn!("HTTP sink enabled but no http_endpoint configured, skipping"),
            },
        }
    }
    sinks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_record_from_event() {
        let event = LogEvent::inbound("<Envelope/>").with_endpoint("basic");

        let record = TapRecord::from_event(&event, false);

        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.endpoint, Some("basic".to_string()));
        assert_eq!(record.size, 11);
        assert!(record.message.is_none());
    }

    #[test]
    fn test_record_with_message() {
        let event = LogEvent::outbound("RESP");
        let record = TapRecord::from_event(&event, true);
        assert_eq!(record.message.as_deref(), Some("RESP"));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"direction\":\"outbound\""));
        assert!(!json.contains("endpoint"));
    }

    #[test]
    fn test_record_format_display() {
        let record = TapRecord {
            timestamp: "2026-01-03T12:00:00Z".to_string(),
            local_time: "2026-01-03 12:00:00".to_string(),
            direction: Direction::Inbound,
            endpoint: Some("secure".to_string()),
            size: 42,
            message: None,
        };

        let display = record.format_display();
        assert!(display.contains("2026-01-03 12:00:00"));
        assert!(display.contains("secure"));
        assert!(display.contains("42 bytes"));
    }

    #[test]
    fn test_record_matches_filter() {
        let record = TapRecord::from_event(&LogEvent::outbound("x").with_endpoint("Orders-Basic"), false);
        assert!(record.matches("outbound"));
        assert!(!record.matches("inbound"));
        assert!(record.matches("orders"));
        assert!(!record.matches("billing"));
    }

    #[test]
    fn test_short_terms_match_endpoints_not_directions() {
        let checkin = TapRecord::from_event(&LogEvent::inbound("x").with_endpoint("checkin"), false);
        let requests = TapRecord::from_event(&LogEvent::outbound("x").with_endpoint("requests"), false);

        assert!(checkin.matches("in"));
        assert!(!requests.matches("in"));
        assert!(requests.matches("request"));
        assert!(!checkin.matches("request"));

        assert!(checkin.matches("dir:in"));
        assert!(requests.matches("dir:reply"));
        assert!(!requests.matches("dir:request"));
        assert!(!checkin.matches("dir:sideways"));
    }

    #[test]
    fn test_sinks_disabled() {
        let config = SinkConfig {
            enabled: false,
            sinks: vec![SinkKind::Stdout],
            http_endpoint: None,
            include_message: false,
            path: PathBuf::from("/tmp"),
        };
        assert!(sinks_from_config(&config).is_empty());
    }

    #[test]
    fn test_http_sink_without_endpoint_is_skipped() {
        let config = SinkConfig {
            enabled: true,
            sinks: vec![SinkKind::Stdout, SinkKind::Http],
            http_endpoint: None,
            include_message: false,
            path: PathBuf::from("/tmp"),
        };
        assert_eq!(sinks_from_config(&config).len(), 1);
    }
}
