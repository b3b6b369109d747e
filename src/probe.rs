//! Metadata probe: low-level size queries against live file handles.
//!
//! Used by the regression suite to assert preallocation and sparse-file
//! semantics on a mounted pool. Every query is point-in-time; snapshots are
//! recomputed on demand and never cached across mutations.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::core::errors::{HarnessError, Result};
use crate::platform::pal::{Platform, StandardInfo, detect_platform};

/// Point-in-time view of a file's sizes plus the volume's allocation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSizeSnapshot {
    /// Bytes of allocation reserved on disk.
    pub allocation_size: u64,
    /// Logical end-of-file offset.
    pub end_of_file: u64,
    /// Allocation-unit size of the containing volume.
    pub cluster_size: u64,
}

impl FileSizeSnapshot {
    /// Round `size` up to the volume's allocation granularity.
    #[must_use]
    pub const fn round_to_cluster(&self, size: u64) -> u64 {
        size.div_ceil(self.cluster_size) * self.cluster_size
    }
}

/// Issues metadata queries through the platform layer.
#[derive(Clone)]
pub struct MetadataProbe {
    platform: Arc<dyn Platform>,
}

impl MetadataProbe {
    /// Probe backed by an explicit platform (tests inject fakes here).
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Probe backed by the real OS implementation.
    #[must_use]
    pub fn system() -> Self {
        Self::new(detect_platform())
    }

    /// Allocation-unit size of the volume containing `path`.
    ///
    /// Succeeds for any mounted, formatted volume; the result is a power of
    /// two no smaller than 512.
    pub fn cluster_size(&self, path: &Path) -> Result<u64> {
        let csize = self.platform.cluster_size(path)?;
        if csize < 512 || !csize.is_power_of_two() {
            return Err(HarnessError::Probe {
                path: path.to_path_buf(),
                details: format!("implausible cluster size {csize}"),
            });
        }
        Ok(csize)
    }

    /// File-level metadata for an open handle, without close/reopen.
    pub fn standard_info(&self, file: &File) -> Result<StandardInfo> {
        self.platform.standard_info(file)
    }

    /// Reserve `size` bytes of allocation; end-of-file is left untouched.
    pub fn preallocate(&self, file: &File, size: u64) -> Result<()> {
        self.platform.preallocate(file, size)
    }

    /// Sizes of an open handle combined with its volume's cluster size.
    pub fn snapshot(&self, file: &File, path: &Path) -> Result<FileSizeSnapshot> {
        let info = self.standard_info(file)?;
        let cluster_size = self.cluster_size(path)?;
        Ok(FileSizeSnapshot {
            allocation_size: info.allocation_size,
            end_of_file: info.end_of_file,
            cluster_size,
        })
    }

    /// Snapshot by path, through a fresh read-only handle.
    pub fn snapshot_path(&self, path: &Path) -> Result<FileSizeSnapshot> {
        let file = File::open(path).map_err(|e| HarnessError::io(path, e))?;
        self.snapshot(&file, path)
    }
}
