//! Sequential scenario execution against a mounted pool.
//!
//! Each scenario is an external command handed the mount path as its final
//! argument. Failures are recorded and the run continues; only harness-side
//! I/O problems (the results log becoming unwritable) abort the run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::errors::Result;
use crate::exec::ToolRunner;
use crate::logger::console::ConsoleLogger;
use crate::pool::context::StorageContext;
use crate::pool::mounts::list_mounts;
use crate::scenario::log::ResultsLog;
use crate::scenario::tap::{self, TapTally};

/// One external test program to run against the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Name used in logs and the results file.
    pub name: String,
    /// Program to invoke.
    pub program: PathBuf,
    /// Arguments placed before the mount path.
    pub args: Vec<OsString>,
}

impl Scenario {
    /// A directly executable scenario.
    #[must_use]
    pub fn executable(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// A test file run through an interpreter (`<interpreter> <script> <mount>`).
    #[must_use]
    pub fn interpreted(
        name: impl Into<String>,
        interpreter: impl Into<PathBuf>,
        script: impl AsRef<Path>,
    ) -> Self {
        Self {
            name: name.into(),
            program: interpreter.into(),
            args: vec![script.as_ref().into()],
        }
    }

    /// Append a fixed argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,
    /// Exit code of the external process (-1 when it could not be spawned).
    pub exit_code: i32,
    /// Everything the scenario printed to stdout.
    pub stdout: String,
    /// Everything the scenario printed to stderr (the spawn error message when
    /// the process could not be started).
    pub stderr: String,
    /// Sub-result counts parsed from stdout.
    pub tally: TapTally,
    /// The line persisted to the results log.
    pub summary: String,
}

impl ScenarioResult {
    /// A scenario passes when the process exited zero and no sub-result failed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.exit_code == 0 && self.tally.all_passed()
    }
}

/// Runs scenarios in order, persisting one summary line each.
pub struct ScenarioRunner<'a> {
    ctx: &'a StorageContext,
    runner: &'a dyn ToolRunner,
    logger: ConsoleLogger,
    log: ResultsLog,
}

impl<'a> ScenarioRunner<'a> {
    /// Runner writing summaries to `log`.
    #[must_use]
    pub fn new(
        ctx: &'a StorageContext,
        runner: &'a dyn ToolRunner,
        logger: ConsoleLogger,
        log: ResultsLog,
    ) -> Self {
        Self {
            ctx,
            runner,
            logger,
            log,
        }
    }

    /// Run every scenario against `mount_path`, in order.
    ///
    /// Scenario failures do not halt the run; the returned results cover every
    /// scenario. The final pass/fail roster is logged at the end.
    pub fn run(&mut self, mount_path: &Path, scenarios: &[Scenario]) -> Result<Vec<ScenarioResult>> {
        let mut results = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            self.logger.banner();
            self.logger.info(format!("Name: {}", scenario.name));
            self.snapshot_mounts();

            let result = self.run_one(scenario, mount_path);
            if !result.passed() {
                self.logger.warn(format!("FAIL {}", scenario.name));
            }
            self.log.record(&result.summary)?;

            self.snapshot_mounts();
            self.logger.banner();
            results.push(result);
        }

        let failed: Vec<&str> = results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.name.as_str())
            .collect();
        if failed.is_empty() {
            self.logger
                .info(format!("all {} scenarios passed", results.len()));
        } else {
            self.logger.warn(format!(
                "{}/{} scenarios failed: {}",
                failed.len(),
                results.len(),
                failed.join(", ")
            ));
        }

        Ok(results)
    }

    fn run_one(&self, scenario: &Scenario, mount_path: &Path) -> ScenarioResult {
        let mut args = scenario.args.clone();
        args.push(mount_path.as_os_str().to_os_string());
        self.logger.debug(format!(
            "running {} {}",
            scenario.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        ));

        match self.runner.run(&scenario.program, &args) {
            Ok(out) => {
                self.logger.debug(format!("returncode={}", out.exit_code));
                if !out.stderr.is_empty() {
                    self.logger.debug(format!("stderr={}", out.stderr.trim_end()));
                }
                let lines = tap::parse(&out.stdout);
                let tally = tap::tally(&lines);
                let summary = if tally.has_results() {
                    format!("{} {tally}", scenario.name)
                } else {
                    let last = out.last_stdout_line().unwrap_or_default();
                    format!("{} {last}", scenario.name)
                };
                ScenarioResult {
                    name: scenario.name.clone(),
                    exit_code: out.exit_code,
                    stdout: out.stdout,
                    stderr: out.stderr,
                    tally,
                    summary,
                }
            }
            Err(e) => {
                self.logger
                    .error(format!("{}: cannot run: {e}", scenario.name));
                ScenarioResult {
                    name: scenario.name.clone(),
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    tally: TapTally::default(),
                    summary: format!("{} failed to start", scenario.name),
                }
            }
        }
    }

    /// Mount state around each scenario, diagnostic only.
    fn snapshot_mounts(&self) {
        match list_mounts(self.ctx, self.runner) {
            Ok(entries) => {
                for e in &entries {
                    self.logger
                        .debug(format!("mounted: {} {}", e.dataset, e.mount_path.display()));
                }
            }
            Err(e) => self.logger.warn(format!("mount listing failed: {e}")),
        }
    }
}
