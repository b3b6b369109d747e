//! Built-in destructive suites run against live pools.

pub mod pools;
pub mod regression;

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::BackingConfig;
use crate::core::errors::{HarnessError, Result};
use crate::exec::{to_args, ToolRunner};
use crate::logger::console::ConsoleLogger;
use crate::platform::pal::Platform;
use crate::pool::context::StorageContext;
use crate::pool::drive::DriveNamespace;
use crate::pool::lifecycle::{PollPolicy, PoolLifecycle};

/// Everything a suite needs to drive external tools and verify their effects.
pub struct SuiteDeps<'a> {
    pub ctx: &'a StorageContext,
    pub runner: &'a dyn ToolRunner,
    pub platform: Arc<dyn Platform>,
    pub namespace: DriveNamespace,
    pub poll: PollPolicy,
    pub logger: ConsoleLogger,
    pub backing: BackingConfig,
}

impl<'a> SuiteDeps<'a> {
    /// Build a [`PoolLifecycle`] over these dependencies.
    pub fn lifecycle(&self) -> PoolLifecycle<'_> {
        PoolLifecycle::new(
            self.ctx,
            self.runner,
            Arc::clone(&self.platform),
            self.namespace.clone(),
            self.poll,
        )
    }

    /// Run a tool invocation that the suite requires to succeed.
    pub(crate) fn run_ok(&self, tool: &Path, args: &[&str]) -> Result<()> {
        let args = to_args(args.iter().copied());
        self.logger
            .debug(crate::exec::display_command(tool, &args));
        let out = self.runner.run(tool, &args)?;
        if out.success() {
            Ok(())
        } else {
            Err(HarnessError::ToolFailed {
                tool: tool
                    .file_name()
                    .map_or_else(|| tool.display().to_string(), |n: &OsStr| {
                        n.to_string_lossy().into_owned()
                    }),
                exit_code: out.exit_code,
                stderr: out.stderr,
            })
        }
    }
}

/// Accumulated per-case outcomes of one suite.
#[derive(Default)]
pub struct SuiteReport {
    passed: Vec<String>,
    failed: Vec<(String, HarnessError)>,
}

impl SuiteReport {
    /// Run one named case; a failure is recorded and the suite proceeds.
    pub fn case(&mut self, logger: ConsoleLogger, name: &str, body: impl FnOnce() -> Result<()>) {
        logger.info("=".repeat(60));
        logger.info(format!("Running test: {name}"));
        match body() {
            Ok(()) => self.passed.push(name.to_string()),
            Err(e) => {
                logger.error(format!("{name}: {e}"));
                self.failed.push((name.to_string(), e));
            }
        }
    }

    /// Total cases run so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// Log the roster and fail if any case failed.
    pub fn finish(self, logger: ConsoleLogger) -> Result<()> {
        for name in &self.passed {
            logger.info(format!("PASS {name}"));
        }
        for (name, e) in &self.failed {
            logger.warn(format!("FAIL {name}: [{}]", e.code()));
        }
        let total = self.total();
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::SuiteFailed {
                failed: self.failed.len(),
                total,
            })
        }
    }
}
