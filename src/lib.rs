//! ZFS pool harness (zph) — provisioning and verification harness for
//! destructive filesystem testing against an external storage CLI.
//!
//! The harness allocates loopback backing files, creates ephemeral pools from
//! them, verifies mount visibility by polling the postcondition, runs external
//! test scenarios against the mounted filesystem, and guarantees teardown in
//! reverse acquisition order.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use zfs_pool_harness::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use zfs_pool_harness::core::config::HarnessConfig;
//! use zfs_pool_harness::pool::lifecycle::{DeviceSpec, PoolLifecycle};
//! ```

pub mod prelude;

pub mod core;
pub mod exec;
pub mod logger;
pub mod platform;
pub mod pool;
pub mod probe;
pub mod resource;
pub mod scenario;
pub mod suites;
