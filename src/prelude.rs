//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use zfs_pool_harness::prelude::*;
//! ```

// Core
pub use crate::core::config::HarnessConfig;
pub use crate::core::errors::{HarnessError, Result};

// Execution
pub use crate::exec::{SystemRunner, ToolOutput, ToolRunner};

// Platform
pub use crate::platform::pal::{detect_platform, Platform, StandardInfo};
pub use crate::probe::MetadataProbe;

// Resources
pub use crate::resource::files::{backing_file, backing_files};
pub use crate::resource::scope::{run_scope, ResourceScope};

// Pools
pub use crate::pool::context::StorageContext;
pub use crate::pool::drive::{DriveLetterAllocator, DriveNamespace, DriveSlot};
pub use crate::pool::lifecycle::{DeviceSpec, OptionMap, PollPolicy, Pool, PoolLifecycle};
pub use crate::pool::mounts::{list_mounts, MountEntry};

// Scenarios
pub use crate::scenario::runner::{Scenario, ScenarioResult, ScenarioRunner};
pub use crate::scenario::tap::TapTally;
