//! JSONL event log: append-only line-delimited JSON for machine consumption.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory and
//! written atomically via `write_all` so a tailing process never sees a partial
//! line.
//!
//! Degradation chain:
//! 1. Configured file path
//! 2. stderr with `[ZPH-JSONL]` prefix
//! 3. Silent discard (logging failures must never fail the run)

#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Event types matching the harness activity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStart,
    RunEnd,
    PoolCreated,
    PoolDestroyed,
    ScenarioStart,
    ScenarioEnd,
    Error,
}

/// A single JSONL entry. `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Pool involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    /// Mount path involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    /// Scenario name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// External tool exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Sub-results that passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<u32>,
    /// Total sub-results reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Harness error code if the event records a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// New entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            pool: None,
            mount_path: None,
            scenario: None,
            exit_code: None,
            passed: None,
            total: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Degradation state of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL writer with stderr fallback.
pub struct JsonlWriter {
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the log file for appending; degrade to stderr on failure.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                writer: Some(BufWriter::with_capacity(16 * 1024, file)),
                state: WriterState::Normal,
            },
            Err(e) => {
                let _ = writeln!(
                    io::stderr(),
                    "[ZPH-JSONL] cannot open {}: {e}, using stderr",
                    path.display()
                );
                Self {
                    writer: None,
                    state: WriterState::Stderr,
                }
            }
        }
    }

    /// A writer that drops every entry, for runs without a JSONL log.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            writer: None,
            state: WriterState::Discard,
        }
    }

    /// Write one entry as a single atomic line, flushed immediately.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[ZPH-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal => {
                let failed = self.writer.as_mut().is_none_or(|w| {
                    w.write_all(line.as_bytes()).is_err() || w.flush().is_err()
                });
                if failed {
                    self.writer = None;
                    self.state = WriterState::Stderr;
                    let _ = write!(io::stderr(), "[ZPH-JSONL] {line}");
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[ZPH-JSONL] {line}");
            }
            WriterState::Discard => {}
        }
    }
}
