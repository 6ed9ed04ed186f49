// progress.rs - Scan log
// Purpose: one explicitly owned log per run. Human readable lines go to
//          scan_report.log, structured stage events to progress.jsonl.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOG_FILE: &str = "scan_report.log";
pub const EVENTS_FILE: &str = "progress.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub scan_id: String,
    pub target: String,
    pub event_type: EventType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventType {
    ScanStarted,
    StageStarted { stage: String },
    StageCompleted { stage: String },
    StageFailed { stage: String, error: String },
    DataFound { data_type: String, count: usize },
    ScanCompleted,
}

/// Append-only log for a single pipeline run.
///
/// Shared by reference (usually behind an `Arc`) with every stage and every
/// fan-out task; writes are serialised by the inner mutexes. Call
/// [`ProgressTracker::finish`] once the run is over.
pub struct ProgressTracker {
    scan_id: String,
    target: String,
    log_path: PathBuf,
    log: Mutex<BufWriter<File>>,
    events_out: Mutex<BufWriter<File>>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("scan_id", &self.scan_id)
            .field("target", &self.target)
            .field("log_path", &self.log_path)
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(scan_id: String, target: String, output_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        let log_path = output_dir.join(LOG_FILE);
        let log = open_append(&log_path)?;
        let events_out = open_append(&output_dir.join(EVENTS_FILE))?;

        Ok(Self {
            scan_id,
            target,
            log_path,
            log: Mutex::new(BufWriter::new(log)),
            events_out: Mutex::new(BufWriter::new(events_out)),
        })
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Ok(mut log) = self.log.lock() {
            writeln!(log, "{} - {} - {}", stamp, level, message).ok();
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Records a structured event and mirrors it into the text log.
    pub fn add_event(&self, event_type: EventType, message: String) {
        let level = match event_type {
            EventType::StageFailed { .. } => LogLevel::Error,
            _ => LogLevel::Info,
        };
        self.log(level, &message);

        let event = ProgressEvent {
            timestamp: Utc::now(),
            scan_id: self.scan_id.clone(),
            target: self.target.clone(),
            event_type,
            message,
        };

        if let Ok(json) = serde_json::to_string(&event) {
            if let Ok(mut out) = self.events_out.lock() {
                writeln!(out, "{}", json).ok();
            }
        }
    }

    pub fn scan_started(&self) {
        self.add_event(
            EventType::ScanStarted,
            format!("Starting scan for domain {}", self.target),
        );
    }

    pub fn stage_started(&self, stage: &str) {
        self.add_event(
            EventType::StageStarted { stage: stage.to_string() },
            format!("{} started", stage),
        );
    }

    pub fn stage_completed(&self, stage: &str) {
        self.add_event(
            EventType::StageCompleted { stage: stage.to_string() },
            format!("{} completed", stage),
        );
    }

    pub fn stage_failed(&self, stage: &str, error: &str) {
        self.add_event(
            EventType::StageFailed {
                stage: stage.to_string(),
                error: error.to_string(),
            },
            format!("{} failed: {}", stage, error),
        );
    }

    pub fn data_found(&self, data_type: &str, count: usize) {
        self.add_event(
            EventType::DataFound {
                data_type: data_type.to_string(),
                count,
            },
            format!("Found {} {}", count, data_type),
        );
    }

    pub fn scan_completed(&self) {
        self.add_event(
            EventType::ScanCompleted,
            format!("Scan of {} completed", self.target),
        );
    }

    pub fn flush(&self) -> io::Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.flush()?;
        }
        if let Ok(mut out) = self.events_out.lock() {
            out.flush()?;
        }
        Ok(())
    }

    /// Flushes both streams and closes the underlying files.
    pub fn finish(self) -> io::Result<()> {
        self.flush()?;
        let log = self.log.into_inner().map_err(|_| poisoned())?;
        let events = self.events_out.into_inner().map_err(|_| poisoned())?;
        log.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        events.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn poisoned() -> io::Error {
    io::Error::other("scan log lock poisoned")
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::written_events;

    #[test]
    fn test_log_lines_are_timestamped_and_levelled() {
        let dir = tempfile::tempdir().unwrap();
        let tracker =
            ProgressTracker::new("id-1".to_string(), "example.com".to_string(), dir.path()).unwrap();

        tracker.info("Running amass");
        tracker.warn("No MX records found for a.example.com");
        tracker.finish().unwrap();

        let content = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - Running amass"));
        assert!(lines[1].contains(" - WARNING - No MX records"));
        // "YYYY-MM-DD HH:MM:SS" prefix
        assert_eq!(&lines[0][4..5], "-");
        assert_eq!(&lines[0][13..14], ":");
    }

    #[test]
    fn test_events_round_trip_through_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let tracker =
            ProgressTracker::new("id-2".to_string(), "example.com".to_string(), dir.path()).unwrap();

        tracker.scan_started();
        tracker.stage_failed("probe", "httpx exited with status 1");
        tracker.data_found("subdomains", 4);

        let events = written_events(&tracker);
        tracker.finish().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, EventType::ScanStarted);
        assert_eq!(
            events[2].event_type,
            EventType::DataFound { data_type: "subdomains".to_string(), count: 4 }
        );

        let log = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        assert!(log.contains("ERROR - probe failed"));
    }

    #[test]
    fn test_log_is_append_only_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        for run in 0..2 {
            let tracker =
                ProgressTracker::new(format!("run-{}", run), "example.com".to_string(), dir.path())
                    .unwrap();
            tracker.info(&format!("run {}", run));
            tracker.finish().unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
