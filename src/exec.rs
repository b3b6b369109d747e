//! External tool invocation: synchronous, captured, behind a trait seam.
//!
//! Every call into the storage tools blocks until the child exits and captures
//! both output streams. The `ToolRunner` trait exists so the pool and scenario
//! layers can be exercised against scripted outputs in tests.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::core::errors::{HarnessError, Result};

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit code; `-1` when terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Captured standard error, lossily decoded as UTF-8.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool reported success.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty stdout line, used for scenario summary lines.
    #[must_use]
    pub fn last_stdout_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .rev()
            .map(str::trim_end)
            .find(|line| !line.is_empty())
    }
}

/// Seam for invoking external programs.
pub trait ToolRunner {
    /// Run `program` with `args`, blocking until it exits.
    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| HarnessError::ToolSpawn {
                program: program.to_path_buf(),
                source: e,
            })?;

        Ok(ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render a command line for diagnostics.
#[must_use]
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Convert string-ish arguments into the `OsString` form `ToolRunner` takes.
#[must_use]
pub fn to_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.into_iter().map(Into::into).collect()
}
