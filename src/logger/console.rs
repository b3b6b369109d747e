//! Leveled console logger for the harness runs.
//!
//! Lines go to stderr as `<ts> - zph - <LEVEL> - <message>` with the level
//! colorized when the terminal supports it. Debug lines are gated on the
//! verbosity knob; `Quiet` keeps only warnings and errors.

#![allow(missing_docs)]

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;

/// How much of the run narrative reaches the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Progress lines for pools and scenarios.
    Normal,
    /// Plus per-invocation command lines and tool output.
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Console logger handed down through the run.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    verbosity: Verbosity,
}

impl ConsoleLogger {
    #[must_use]
    pub const fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.verbosity >= Verbosity::Verbose {
            self.emit(Level::Debug, message.as_ref());
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if self.verbosity >= Verbosity::Normal {
            self.emit(Level::Info, message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(Level::Error, message.as_ref());
    }

    /// A bare separator banner, printed regardless of timestamping so
    /// scenario boundaries stand out in captured output.
    pub fn banner(&self) {
        if self.verbosity >= Verbosity::Normal {
            let _ = writeln!(io::stderr(), "{}", "=".repeat(20));
        }
    }

    fn emit(&self, level: Level, message: &str) {
        let ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let label = match level {
            Level::Debug => level.to_string().dimmed(),
            Level::Info => level.to_string().green(),
            Level::Warn => level.to_string().yellow(),
            Level::Error => level.to_string().red().bold(),
        };
        let _ = writeln!(io::stderr(), "{ts} - zph - {label} - {message}");
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}
