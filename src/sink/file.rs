//! JSONL file sink

use chrono::Local;
use eyre::{Context, Result};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::TapRecord;
use crate::broadcast::Observer;
use crate::event::LogEvent;

/// Appends one JSON line per event to a daily file
pub struct FileSink {
    dir: PathBuf,
    include_message: bool,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(dir: PathBuf, include_message: bool) -> Self {
        Self {
            dir,
            include_message,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File today's events go to
    pub fn current_file(&self) -> PathBuf {
        daily_file(&self.dir, Local::now())
    }
}

/// `<dir>/YYYY-MM/YYYY-MM-DD.jsonl`
pub fn daily_file(dir: &Path, date: chrono::DateTime<Local>) -> PathBuf {
    dir.join(date.format("%Y-%m").to_string())
        .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
}

impl Observer for FileSink {
    fn on_event(&self, event: &LogEvent) -> Result<()> {
        let record = TapRecord::from_event(event, self.include_message);
        let json = serde_json::to_string(&record).context("Failed to serialize tap record")?;

        let log_file = self.current_file();
        let _guard = self.write_lock.lock();

        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create tap log directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open tap log {}", log_file.display()))?;

        writeln!(file, "{}", json).context("Failed to write tap record")?;

        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_appends_jsonl() {
        let temp = tempdir().unwrap();
        let sink = FileSink::new(temp.path().to_path_buf(), true);

        sink.on_event(&LogEvent::inbound("REQ").with_endpoint("basic")).unwrap();
        sink.on_event(&LogEvent::outbound("RESP").with_endpoint("basic")).unwrap();

        let content = fs::read_to_string(sink.current_file()).unwrap();
        let records: Vec<TapRecord> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.as_deref(), Some("REQ"));
        assert_eq!(records[1].message.as_deref(), Some("RESP"));
        assert_eq!(records[1].endpoint.as_deref(), Some("basic"));
    }

    #[test]
    fn test_daily_file_layout() {
        let date = Local::now();
        let path = daily_file(Path::new("/var/taps"), date);
        let expected = format!("/var/taps/{}/{}.jsonl", date.format("%Y-%m"), date.format("%Y-%m-%d"));
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn test_unwritable_dir_reports_error() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let sink = FileSink::new(blocker, false);
        assert!(sink.on_event(&LogEvent::inbound("REQ")).is_err());
    }
}
