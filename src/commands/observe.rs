//! Live tap observation command
//!
//! Tails the tap log in real-time, similar to `tail -f`.

use chrono::Local;
use colored::*;
use eyre::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::Duration;

use msgtap::config::Config;
use msgtap::sink::TapRecord;
use msgtap::sink::file::daily_file;
use msgtap::sink::stdout::print_record;

pub fn run(filter: Option<&str>, last: usize, include_message: bool, config: &Config) -> Result<()> {
    let taps_dir = Config::expand_path(&config.sinks.path);

    println!("{} Observing taps in {} (Ctrl+C to stop)...", "👁".blue(), taps_dir.display());
    if let Some(f) = filter {
        println!("  Filter: {}", f.cyan());
    }
    println!();

    if last > 0 {
        show_recent(&taps_dir, last, filter, include_message)?;
        println!("{}", "--- Live tail ---".dimmed());
        println!();
    }

    tail(&taps_dir, filter, include_message)
}

/// Parse the records in one JSONL file, skipping lines that don't match
pub fn read_records(log_file: &Path, filter: Option<&str>) -> Result<Vec<TapRecord>> {
    let content = fs::read_to_string(log_file).context("Failed to read tap log")?;

    let records = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<TapRecord>(line).ok())
        .filter(|record| filter.map(|f| record.matches(f)).unwrap_or(true))
        .collect();

    Ok(records)
}

/// Show the last N records from yesterday's and today's logs
fn show_recent(taps_dir: &Path, count: usize, filter: Option<&str>, include_message: bool) -> Result<()> {
    let today = Local::now();
    let yesterday = today - chrono::Duration::days(1);

    let mut all = Vec::new();
    for date in [yesterday, today] {
        let log_file = daily_file(taps_dir, date);
        if log_file.exists() {
            all.extend(read_records(&log_file, filter)?);
        }
    }

    let start = all.len().saturating_sub(count);
    for record in &all[start..] {
        print_record(record, include_message);
    }

    Ok(())
}

fn tail(taps_dir: &Path, filter: Option<&str>, include_message: bool) -> Result<()> {
    loop {
        let today = Local::now();
        let log_file = daily_file(taps_dir, today);

        if !log_file.exists() {
            thread::sleep(Duration::from_secs(1));
            continue;
        }

        let file = File::open(&log_file).context("Failed to open tap log")?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0))?;

        let mut line = String::new();
        loop {
            match reader.read_line(&mut line) {
                Ok(0) => {
                    thread::sleep(Duration::from_millis(100));

                    // Crossed midnight, switch to the new day's file
                    if Local::now().format("%Y-%m-%d").to_string() != today.format("%Y-%m-%d").to_string() {
                        break;
                    }
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty()
                        && let Ok(record) = serde_json::from_str::<TapRecord>(trimmed)
                        && filter.map(|f| record.matches(f)).unwrap_or(true)
                    {
                        print_record(&record, include_message);
                    }
                    line.clear();
                }
                Err(e) => {
                    log::warn!("Error reading tap log: {}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }
}
