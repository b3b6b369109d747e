//! Pool lifecycle orchestration: scoped create/verify/destroy.
//!
//! `with_pool` creates a named pool from backing devices, waits for the mount
//! to become visible, hands the live pool to the caller, and destroys it on
//! the way out unless the caller opted out. Mount visibility is asynchronous
//! in the external tool, so both postconditions (mount appears, mount
//! disappears) are awaited with bounded polling instead of fixed sleeps.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::config::PollConfig;
use crate::core::errors::{HarnessError, Result};
use crate::core::paths::extended_length;
use crate::exec::ToolRunner;
use crate::platform::pal::Platform;
use crate::pool::context::StorageContext;
use crate::pool::drive::{DriveLetterAllocator, DriveNamespace};

/// Unordered key→value option mapping emitted as repeated `-o`/`-O` flags.
pub type OptionMap = BTreeMap<String, String>;

/// One vdev argument: a device path or a topology keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSpec {
    /// A backing file or block device; normalized to extended-length form.
    Path(PathBuf),
    /// A topology word (`mirror`, `raidz`, ...) passed through verbatim.
    Word(String),
}

impl DeviceSpec {
    /// Device from a path.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Topology keyword.
    #[must_use]
    pub fn word(word: impl Into<String>) -> Self {
        Self::Word(word.into())
    }

    fn to_arg(&self) -> OsString {
        match self {
            Self::Path(p) => extended_length(p).into_os_string(),
            Self::Word(w) => OsString::from(w),
        }
    }
}

/// Render an option map as repeated `<flag> key=value` argument pairs.
///
/// Every key is emitted exactly once; `BTreeMap` iteration keeps the emitted
/// command line reproducible.
#[must_use]
pub fn option_args(flag: &str, options: &OptionMap) -> Vec<OsString> {
    options
        .iter()
        .flat_map(|(k, v)| [OsString::from(flag), OsString::from(format!("{k}={v}"))])
        .collect()
}

/// Bounded retry/backoff policy for awaiting mount-state postconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total number of checks.
    pub attempts: u32,
    /// Delay before the second check; doubles per retry.
    pub initial_delay: Duration,
    /// Cap on the per-retry delay.
    pub max_delay: Duration,
}

impl From<&PollConfig> for PollPolicy {
    fn from(cfg: &PollConfig) -> Self {
        Self {
            attempts: cfg.attempts,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }
}

impl PollPolicy {
    /// Policy for tests: a handful of near-immediate checks.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    /// Re-check `condition` until it holds or attempts run out.
    pub fn wait_until(&self, mut condition: impl FnMut() -> bool) -> bool {
        let mut delay = self.initial_delay;
        for attempt in 0..self.attempts {
            if condition() {
                return true;
            }
            if attempt + 1 < self.attempts {
                thread::sleep(delay);
                delay = (delay * 2).min(self.max_delay);
            }
        }
        false
    }
}

/// A live, mounted pool handed to the caller's scope body.
#[derive(Debug)]
pub struct Pool {
    name: String,
    mount_path: PathBuf,
    destroy: bool,
}

impl Pool {
    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the pool is mounted at.
    #[must_use]
    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// Whether automatic destroy will run on scope exit.
    #[must_use]
    pub const fn destroy_on_exit(&self) -> bool {
        self.destroy
    }

    /// Opt out of automatic destroy, for pools already torn down out-of-band
    /// (e.g. exported). Post-teardown verification for that alternate path is
    /// the caller's responsibility.
    pub fn set_destroy(&mut self, destroy: bool) {
        self.destroy = destroy;
    }
}

/// Orchestrates scoped pool create/destroy against the external tools.
pub struct PoolLifecycle<'a> {
    ctx: &'a StorageContext,
    runner: &'a dyn ToolRunner,
    platform: Arc<dyn Platform>,
    namespace: DriveNamespace,
    poll: PollPolicy,
}

impl<'a> PoolLifecycle<'a> {
    /// Lifecycle bound to a tool context, runner, platform and namespace.
    #[must_use]
    pub fn new(
        ctx: &'a StorageContext,
        runner: &'a dyn ToolRunner,
        platform: Arc<dyn Platform>,
        namespace: DriveNamespace,
        poll: PollPolicy,
    ) -> Self {
        Self {
            ctx,
            runner,
            platform,
            namespace,
            poll,
        }
    }

    /// Fresh allocator over the current mount state.
    ///
    /// Letters are not reserved, so callers must re-query after every pool
    /// creation or destruction.
    #[must_use]
    pub fn allocator(&self) -> DriveLetterAllocator {
        DriveLetterAllocator::new(Arc::clone(&self.platform), self.namespace.clone())
    }

    /// Create `name` from `devices`, run `body` against the mounted pool, and
    /// destroy it on exit (unless the body cleared the destroy flag).
    ///
    /// Any error after the create command has succeeded unwinds the pool
    /// before propagating; a teardown failure is surfaced in addition to, and
    /// never instead of, an in-flight error.
    pub fn with_pool<R>(
        &self,
        name: &str,
        devices: &[DeviceSpec],
        pool_options: &OptionMap,
        fs_options: &OptionMap,
        body: impl FnOnce(&mut Pool) -> Result<R>,
    ) -> Result<R> {
        if devices.is_empty() {
            return Err(HarnessError::InvalidConfig {
                details: format!("pool `{name}` needs at least one device"),
            });
        }

        let mut fs_options = fs_options.clone();
        let mount_path = self.resolve_mount(&mut fs_options)?;

        self.create(name, devices, pool_options, &fs_options)?;

        // The pool exists from here on: every failure path must unwind it.
        let mut pool = Pool {
            name: name.to_string(),
            mount_path,
            destroy: true,
        };

        let outcome = self
            .verify_mounted(&pool)
            .and_then(|()| body(&mut pool));

        let teardown = if pool.destroy { self.destroy(&pool) } else { Ok(()) };

        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(primary), Err(cleanup)) => Err(HarnessError::during_cleanup(primary, cleanup)),
        }
    }

    /// Mount path for this pool: the explicit identifier when one was
    /// requested via options, otherwise the next free one, injected into the
    /// options so the external tool mounts at a predictable place.
    fn resolve_mount(&self, fs_options: &mut OptionMap) -> Result<PathBuf> {
        let key = self.namespace.option_key();
        if let Some(value) = fs_options.get(key) {
            return Ok(match &self.namespace {
                DriveNamespace::Letters => PathBuf::from(format!("{value}:\\")),
                DriveNamespace::Under(_) => PathBuf::from(value),
            });
        }

        let slot = self.allocator().next_free()?;
        fs_options.insert(key.to_string(), self.namespace.option_value(slot.letter));
        Ok(slot.mount_path)
    }

    fn create(
        &self,
        name: &str,
        devices: &[DeviceSpec],
        pool_options: &OptionMap,
        fs_options: &OptionMap,
    ) -> Result<()> {
        let mut args: Vec<OsString> = vec!["create".into(), "-f".into()];
        args.extend(option_args("-o", pool_options));
        args.extend(option_args("-O", fs_options));
        args.push(name.into());
        args.extend(devices.iter().map(DeviceSpec::to_arg));

        let out = self.runner.run(self.ctx.pool_tool(), &args)?;
        if !out.success() {
            return Err(HarnessError::CreationFailed {
                pool: name.to_string(),
                exit_code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            });
        }
        Ok(())
    }

    fn verify_mounted(&self, pool: &Pool) -> Result<()> {
        let mounted = self
            .poll
            .wait_until(|| self.platform.mount_dir_exists(&pool.mount_path));
        if mounted {
            Ok(())
        } else {
            Err(HarnessError::MountVerificationFailed {
                pool: pool.name.clone(),
                mount_path: pool.mount_path.clone(),
            })
        }
    }

    fn destroy(&self, pool: &Pool) -> Result<()> {
        let args: Vec<OsString> = vec!["destroy".into(), "-f".into(), pool.name.as_str().into()];
        let out = self.runner.run(self.ctx.pool_tool(), &args)?;
        if !out.success() {
            return Err(HarnessError::TeardownFailed {
                pool: pool.name.clone(),
                exit_code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            });
        }

        let unmounted = self
            .poll
            .wait_until(|| !self.platform.mount_dir_exists(&pool.mount_path));
        if unmounted {
            Ok(())
        } else {
            Err(HarnessError::TeardownVerificationFailed {
                pool: pool.name.clone(),
                mount_path: pool.mount_path.clone(),
            })
        }
    }
}
