//! Top-level CLI definition and dispatch.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::control;
use thiserror::Error;

use zfs_pool_harness::core::config::HarnessConfig;
use zfs_pool_harness::core::errors::HarnessError;
use zfs_pool_harness::core::paths::resolve_absolute_path;
use zfs_pool_harness::exec::{SystemRunner, ToolRunner};
use zfs_pool_harness::logger::console::{ConsoleLogger, Verbosity};
use zfs_pool_harness::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use zfs_pool_harness::platform::pal::{detect_platform, Platform};
use zfs_pool_harness::pool::context::StorageContext;
use zfs_pool_harness::pool::drive::DriveNamespace;
use zfs_pool_harness::pool::lifecycle::{DeviceSpec, OptionMap, PollPolicy};
use zfs_pool_harness::resource::files::backing_file;
use zfs_pool_harness::resource::scope::run_scope;
use zfs_pool_harness::scenario::log::ResultsLog;
use zfs_pool_harness::scenario::runner::{Scenario, ScenarioRunner};
use zfs_pool_harness::suites::{self, SuiteDeps};

/// Filesystem-resource provisioning and verification harness.
#[derive(Debug, Parser)]
#[command(
    name = "zph",
    author,
    version,
    about = "ZFS pool provisioning and verification harness",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Storage-tool installation directory override.
    #[arg(long, global = true, value_name = "DIR")]
    tools: Option<PathBuf>,
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write machine-readable run events to this JSONL file.
    #[arg(long, global = true, value_name = "PATH")]
    json_log: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Provision a pool and run external test scenarios against it.
    Run(RunArgs),
    /// Run the pool topology matrix suite.
    Pools(PoolsArgs),
    /// Run the preallocation regression suite.
    Regression(RegressionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Working directory for backing files and the results log.
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
    /// Scenario programs to run, in order.
    #[arg(value_name = "PROGRAM", required = true)]
    scenarios: Vec<PathBuf>,
    /// Run scenario files through this interpreter instead of directly.
    #[arg(long, value_name = "PROGRAM")]
    interpreter: Option<PathBuf>,
    /// Skip pool provisioning and run scenarios against --path itself.
    #[arg(long)]
    no_pool: bool,
    /// Results log file name, created inside --path.
    #[arg(long, value_name = "FILE")]
    log: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct PoolsArgs {
    /// Working directory for backing files.
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct RegressionArgs {
    /// Working directory for the backing file (or the test directory itself
    /// with --no-pool).
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
    /// Skip pool provisioning and probe --path directly.
    #[arg(long)]
    no_pool: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Harness failure while provisioning or verifying.
    #[error("{0}")]
    Harness(#[from] HarnessError),
    /// One or more scenarios or suite cases failed.
    #[error("{0}")]
    Partial(String),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Harness(_) | Self::Io(_) => 2,
            Self::Partial(_) => 4,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_scenarios(cli, args),
        Command::Pools(args) => run_pools(cli, args),
        Command::Regression(args) => run_regression(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── shared environment ────────────────────

struct Env {
    config: HarnessConfig,
    ctx: StorageContext,
    platform: Arc<dyn Platform>,
    namespace: DriveNamespace,
    logger: ConsoleLogger,
    events: JsonlWriter,
    /// Absolute, normalized working directory; everything the run creates
    /// (backing files, mount roots, logs) lands under it.
    work_dir: PathBuf,
}

impl Env {
    fn build(cli: &Cli, work_dir: &Path) -> Result<Self, CliError> {
        let work_dir = resolve_absolute_path(work_dir);
        if !work_dir.is_dir() {
            return Err(CliError::User(format!(
                "{} is not a valid directory",
                work_dir.display()
            )));
        }

        let mut config = HarnessConfig::load(cli.config.as_deref())?;
        if let Some(tools) = &cli.tools {
            config.paths.tools_dir.clone_from(tools);
        }
        config.validate()?;

        let ctx = StorageContext::locate(&config.paths.tools_dir)?;
        let platform = detect_platform();
        let namespace = if cfg!(windows) {
            DriveNamespace::Letters
        } else {
            let root = config
                .paths
                .mount_root
                .clone()
                .unwrap_or_else(|| work_dir.join("mnt"));
            std::fs::create_dir_all(&root)?;
            DriveNamespace::Under(root)
        };

        let verbosity = if cli.quiet {
            Verbosity::Quiet
        } else if cli.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let logger = ConsoleLogger::new(verbosity);

        let events = cli
            .json_log
            .as_deref()
            .or(config.paths.jsonl_log.as_deref())
            .map_or_else(JsonlWriter::disabled, JsonlWriter::open);

        Ok(Self {
            config,
            ctx,
            platform,
            namespace,
            logger,
            events,
            work_dir,
        })
    }

    fn deps<'a>(&'a self, runner: &'a dyn ToolRunner) -> SuiteDeps<'a> {
        SuiteDeps {
            ctx: &self.ctx,
            runner,
            platform: Arc::clone(&self.platform),
            namespace: self.namespace.clone(),
            poll: PollPolicy::from(&self.config.poll),
            logger: self.logger,
            backing: self.config.backing.clone(),
        }
    }

    fn event(&mut self, event: EventType, severity: Severity, details: Option<String>) {
        let mut entry = LogEntry::new(event, severity);
        entry.details = details;
        self.events.write_entry(&entry);
    }
}

// ──────────────────── subcommands ────────────────────

fn run_scenarios(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut env = Env::build(cli, &args.path)?;
    let runner = SystemRunner;
    env.event(EventType::RunStart, Severity::Info, None);

    let interpreter = args
        .interpreter
        .clone()
        .or_else(|| env.config.scenario.interpreter.clone());
    let scenarios: Vec<Scenario> = args
        .scenarios
        .iter()
        .map(|program| {
            let name = program.display().to_string();
            interpreter.as_ref().map_or_else(
                || Scenario::executable(&name, program),
                |interp| Scenario::interpreted(&name, interp, program),
            )
        })
        .collect();

    let log_name = args
        .log
        .clone()
        .unwrap_or_else(|| env.config.scenario.results_log.clone());
    let log = ResultsLog::create(&env.work_dir.join(&log_name))?;

    let results = if args.no_pool {
        let mut sr = ScenarioRunner::new(&env.ctx, &runner, env.logger, log);
        sr.run(&env.work_dir, &scenarios)?
    } else {
        let deps = env.deps(&runner);
        let lifecycle = deps.lifecycle();
        let no_opts = OptionMap::new();
        run_scope(|scope| {
            let device = backing_file(
                scope,
                &env.work_dir.join("test01.dat"),
                env.config.backing.file_size_bytes,
            )?;
            lifecycle.with_pool(
                "test01",
                &[DeviceSpec::path(&device)],
                &no_opts,
                &no_opts,
                |pool| {
                    let mut sr = ScenarioRunner::new(&env.ctx, &runner, env.logger, log);
                    sr.run(pool.mount_path(), &scenarios)
                },
            )
        })?
    };

    let failed = results.iter().filter(|r| !r.passed()).count();
    for r in &results {
        let mut entry = LogEntry::new(
            EventType::ScenarioEnd,
            if r.passed() {
                Severity::Info
            } else {
                Severity::Warning
            },
        );
        entry.scenario = Some(r.name.clone());
        entry.exit_code = Some(r.exit_code);
        if r.tally.has_results() {
            entry.passed = Some(r.tally.passed);
            entry.total = Some(r.tally.total());
        }
        if !r.passed() {
            let output = if r.stderr.trim().is_empty() {
                &r.stdout
            } else {
                &r.stderr
            };
            if !output.trim().is_empty() {
                entry.details = Some(output.trim_end().to_string());
            }
        }
        env.events.write_entry(&entry);
    }
    env.event(EventType::RunEnd, Severity::Info, None);

    if failed > 0 {
        Err(CliError::Partial(format!(
            "{failed} of {} scenarios failed (see {log_name})",
            results.len()
        )))
    } else {
        Ok(())
    }
}

fn run_pools(cli: &Cli, args: &PoolsArgs) -> Result<(), CliError> {
    let mut env = Env::build(cli, &args.path)?;
    let runner = SystemRunner;
    env.event(EventType::RunStart, Severity::Info, None);

    let outcome = suites::pools::run(&env.deps(&runner), &env.work_dir);
    finish_suite(&mut env, outcome)
}

fn run_regression(cli: &Cli, args: &RegressionArgs) -> Result<(), CliError> {
    let mut env = Env::build(cli, &args.path)?;
    let runner = SystemRunner;
    env.event(EventType::RunStart, Severity::Info, None);

    let outcome = suites::regression::run(&env.deps(&runner), &env.work_dir, args.no_pool);
    finish_suite(&mut env, outcome)
}

fn finish_suite(env: &mut Env, outcome: Result<(), HarnessError>) -> Result<(), CliError> {
    match outcome {
        Ok(()) => {
            env.event(EventType::RunEnd, Severity::Info, None);
            Ok(())
        }
        Err(e @ HarnessError::SuiteFailed { .. }) => {
            env.event(EventType::RunEnd, Severity::Warning, Some(e.to_string()));
            Err(CliError::Partial(e.to_string()))
        }
        Err(e) => {
            let mut entry = LogEntry::new(EventType::Error, Severity::Critical);
            entry.error_code = Some(e.code().to_string());
            entry.error_message = Some(e.to_string());
            env.events.write_entry(&entry);
            Err(CliError::Harness(e))
        }
    }
}
