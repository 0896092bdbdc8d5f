//! Console sink

use colored::*;
use eyre::Result;

use super::TapRecord;
use crate::broadcast::Observer;
use crate::event::LogEvent;

/// Prints a one-line summary per event, optionally followed by the message
pub struct StdoutSink {
    include_message: bool,
}

impl StdoutSink {
    pub fn new(include_message: bool) -> Self {
        Self { include_message }
    }
}

/// Print a record, indenting the message body under it
pub fn print_record(record: &TapRecord, include_message: bool) {
    println!("{}", record.format_display());

    if include_message && let Some(ref message) = record.message {
        for line in message.lines() {
            println!("  {}", line.dimmed());
        }
    }
}

impl Observer for StdoutSink {
    fn on_event(&self, event: &LogEvent) -> Result<()> {
        let record = TapRecord::from_event(event, self.include_message);
        print_record(&record, self.include_message);
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
