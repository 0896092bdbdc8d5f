//! HTTP sink

use eyre::{Context, Result};

use super::TapRecord;
use crate::broadcast::Observer;
use crate::event::LogEvent;

/// POSTs each event as JSON to a collector
pub struct HttpSink {
    endpoint: String,
    include_message: bool,
}

impl HttpSink {
    pub fn new(endpoint: String, include_message: bool) -> Self {
        Self {
            endpoint,
            include_message,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Observer for HttpSink {
    fn on_event(&self, event: &LogEvent) -> Result<()> {
        let record = TapRecord::from_event(event, self.include_message);
        let body = serde_json::to_string(&record).context("Failed to serialize tap record")?;

        ureq::post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .with_context(|| format!("HTTP request to {} failed", self.endpoint))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
