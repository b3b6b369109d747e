//! Configuration system: TOML file + smart defaults + validation.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{HarnessError, Result};
use crate::core::units::{GIB, MIB};

/// Full harness configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct HarnessConfig {
    pub backing: BackingConfig,
    pub poll: PollConfig,
    pub scenario: ScenarioConfig,
    pub paths: PathsConfig,
}

/// Backing-file allocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackingConfig {
    /// How many loopback backing files the pool suite allocates up front.
    pub file_count: usize,
    /// Size of each backing file in bytes.
    pub file_size_bytes: u64,
}

/// Bounded postcondition-polling policy for mount/unmount visibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of postcondition checks before giving up.
    pub attempts: u32,
    /// Delay before the second check; doubles on each retry.
    pub initial_delay_ms: u64,
    /// Upper bound on the per-retry delay.
    pub max_delay_ms: u64,
}

/// Scenario-runner behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenarioConfig {
    /// File name of the per-run results log, created inside the test path.
    pub results_log: String,
    /// Interpreter used to run script scenarios (e.g. `python3`); scripts are
    /// executed directly when unset.
    pub interpreter: Option<PathBuf>,
}

/// Filesystem locations used by the harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// Storage-tool installation or build directory.
    pub tools_dir: PathBuf,
    /// When set, pools mount under `<mount_root>/<letter>` instead of the
    /// Windows drive namespace.
    pub mount_root: Option<PathBuf>,
    /// Optional JSONL event-log destination.
    pub jsonl_log: Option<PathBuf>,
}

impl Default for BackingConfig {
    fn default() -> Self {
        Self {
            file_count: 3,
            file_size_bytes: GIB,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 10,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            results_log: "winfs.log".to_string(),
            interpreter: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tools_dir: default_tools_dir(),
            mount_root: None,
            jsonl_log: None,
        }
    }
}

/// Well-known storage-tool installation directory for the platform.
#[must_use]
pub fn default_tools_dir() -> PathBuf {
    if cfg!(windows) {
        let program_files =
            env::var_os("ProgramFiles").map_or_else(|| PathBuf::from(r"C:\Program Files"), Into::into);
        program_files.join("OpenZFS On Windows")
    } else {
        PathBuf::from("/usr/local/zfs")
    }
}

impl HarnessConfig {
    /// Load configuration from an explicit TOML file, or defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg = match path {
            Some(file) => {
                let raw = fs::read_to_string(file).map_err(|e| HarnessError::io(file, e))?;
                toml::from_str::<Self>(&raw)?
            }
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.backing.file_count == 0 {
            return Err(HarnessError::InvalidConfig {
                details: "backing.file_count must be at least 1".to_string(),
            });
        }
        // The external pool tool rejects devices smaller than 64 MiB.
        if self.backing.file_size_bytes < 64 * MIB {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "backing.file_size_bytes ({}) below the 64 MiB device minimum",
                    self.backing.file_size_bytes
                ),
            });
        }
        if self.poll.attempts == 0 {
            return Err(HarnessError::InvalidConfig {
                details: "poll.attempts must be at least 1".to_string(),
            });
        }
        if self.poll.max_delay_ms < self.poll.initial_delay_ms {
            return Err(HarnessError::InvalidConfig {
                details: format!(
                    "poll.max_delay_ms ({}) below poll.initial_delay_ms ({})",
                    self.poll.max_delay_ms, self.poll.initial_delay_ms
                ),
            });
        }
        if self.scenario.results_log.is_empty() {
            return Err(HarnessError::InvalidConfig {
                details: "scenario.results_log must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
