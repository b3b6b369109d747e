//! PAL trait and platform-specific implementations (Unix, Windows).
//!
//! The harness needs three low-level metadata queries (volume cluster size,
//! file standard information, allocation-size preallocation) plus a mount-dir
//! probe. On Windows these are the driver-facing syscalls the harness exists to
//! exercise; the Unix implementation maps them onto `statvfs`/`fallocate`
//! equivalents so the harness and its test suite run against POSIX builds too.

#![allow(missing_docs)]

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::core::errors::{HarnessError, Result};

/// File-level metadata from one point-in-time query against an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardInfo {
    /// Bytes of on-disk allocation reserved for the file.
    pub allocation_size: u64,
    /// Logical end-of-file offset.
    pub end_of_file: u64,
    /// Number of hard links.
    pub link_count: u32,
    /// Whether deletion is pending (no remaining links on Unix).
    pub delete_pending: bool,
    /// Whether the handle refers to a directory.
    pub is_directory: bool,
}

/// OS abstraction for the metadata probe and mount checks.
///
/// Every operation is a point-in-time query; implementations never retry and
/// never swallow a failure.
pub trait Platform: Send + Sync {
    /// Allocation-unit size in bytes of the volume containing `path`.
    fn cluster_size(&self, path: &Path) -> Result<u64>;
    /// Standard file information for an open handle, without close/reopen.
    fn standard_info(&self, file: &File) -> Result<StandardInfo>;
    /// Reserve `size` bytes of allocation without moving end-of-file.
    fn preallocate(&self, file: &File, size: u64) -> Result<()>;
    /// Whether `path` currently exists as a directory (mount visibility probe).
    fn mount_dir_exists(&self, path: &Path) -> bool;
}

/// Pick the implementation for the current OS.
#[must_use]
pub fn detect_platform() -> Arc<dyn Platform> {
    #[cfg(unix)]
    {
        Arc::new(UnixPlatform)
    }
    #[cfg(windows)]
    {
        Arc::new(WindowsPlatform)
    }
}

fn probe_error(path: &Path, details: impl Into<String>) -> HarnessError {
    HarnessError::Probe {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

/// Root of the volume containing `path` (drive root on Windows, `/` otherwise).
fn volume_root(path: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push(prefix.as_os_str()),
            Component::RootDir => {
                root.push(component.as_os_str());
                break;
            }
            _ => break,
        }
    }
    if root.as_os_str().is_empty() {
        PathBuf::from(std::path::MAIN_SEPARATOR_STR)
    } else {
        root
    }
}

// ──────────────────── Unix ────────────────────

/// Unix implementation mapping the probe onto `statvfs` and `fallocate`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixPlatform;

#[cfg(unix)]
impl Platform for UnixPlatform {
    fn cluster_size(&self, path: &Path) -> Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path)
            .map_err(|e| probe_error(path, format!("statvfs: {e}")))?;
        #[allow(clippy::useless_conversion)] // fragment_size is u32 on some libc targets
        Ok(u64::from(stat.fragment_size()))
    }

    fn standard_info(&self, file: &File) -> Result<StandardInfo> {
        use std::os::unix::fs::MetadataExt;

        let meta = file
            .metadata()
            .map_err(|e| probe_error(Path::new("<open handle>"), format!("fstat: {e}")))?;
        Ok(StandardInfo {
            // st_blocks is always in 512-byte units regardless of block size.
            allocation_size: meta.blocks().saturating_mul(512),
            end_of_file: meta.size(),
            link_count: u32::try_from(meta.nlink()).unwrap_or(u32::MAX),
            delete_pending: meta.nlink() == 0,
            is_directory: meta.is_dir(),
        })
    }

    #[cfg(target_os = "linux")]
    fn preallocate(&self, file: &File, size: u64) -> Result<()> {
        use nix::fcntl::{FallocateFlags, fallocate};

        let len = i64::try_from(size).map_err(|_| {
            probe_error(
                Path::new("<open handle>"),
                format!("preallocation size {size} out of range"),
            )
        })?;
        // KEEP_SIZE reserves blocks without advancing end-of-file, matching
        // the FileAllocationInfo semantics on the Windows side.
        fallocate(file, FallocateFlags::FALLOC_FL_KEEP_SIZE, 0, len)
            .map_err(|e| probe_error(Path::new("<open handle>"), format!("fallocate: {e}")))
    }

    #[cfg(not(target_os = "linux"))]
    fn preallocate(&self, _file: &File, _size: u64) -> Result<()> {
        Err(probe_error(
            Path::new("<open handle>"),
            "preallocation without end-of-file movement is unsupported on this OS",
        ))
    }

    fn mount_dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

// ──────────────────── Windows ────────────────────

/// Windows implementation issuing the real driver-facing queries.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

#[cfg(windows)]
#[allow(unsafe_code)]
mod windows_impl {
    use super::{Path, Result, StandardInfo, probe_error, volume_root};
    use std::fs::File;
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::os::windows::io::AsRawHandle;

    use winapi::shared::minwindef::DWORD;
    use winapi::um::fileapi::{FILE_ALLOCATION_INFO, GetDiskFreeSpaceW, SetFileInformationByHandle};
    use winapi::um::minwinbase::{FILE_INFO_BY_HANDLE_CLASS, FileAllocationInfo, FileStandardInfo};
    use winapi::um::winbase::GetFileInformationByHandleEx;
    use winapi::um::winnt::HANDLE;

    #[repr(C)]
    struct FileStandardInfoRaw {
        allocation_size: i64,
        end_of_file: i64,
        number_of_links: DWORD,
        delete_pending: u8,
        directory: u8,
    }

    fn wide_null(path: &Path) -> Vec<u16> {
        path.as_os_str().encode_wide().chain(Some(0)).collect()
    }

    pub(super) fn cluster_size(path: &Path) -> Result<u64> {
        let root = volume_root(path);
        let root_wide = wide_null(&root);
        let mut sectors_per_cluster: DWORD = 0;
        let mut bytes_per_sector: DWORD = 0;
        let mut free_clusters: DWORD = 0;
        let mut total_clusters: DWORD = 0;

        let ok = unsafe {
            GetDiskFreeSpaceW(
                root_wide.as_ptr(),
                &mut sectors_per_cluster,
                &mut bytes_per_sector,
                &mut free_clusters,
                &mut total_clusters,
            )
        };
        if ok == 0 {
            return Err(probe_error(
                path,
                format!("GetDiskFreeSpaceW: {}", std::io::Error::last_os_error()),
            ));
        }
        Ok(u64::from(sectors_per_cluster) * u64::from(bytes_per_sector))
    }

    pub(super) fn standard_info(file: &File) -> Result<StandardInfo> {
        let mut raw: FileStandardInfoRaw = unsafe { mem::zeroed() };
        let ok = unsafe {
            GetFileInformationByHandleEx(
                file.as_raw_handle() as HANDLE,
                FileStandardInfo,
                std::ptr::from_mut(&mut raw).cast(),
                mem::size_of::<FileStandardInfoRaw>() as DWORD,
            )
        };
        if ok == 0 {
            return Err(probe_error(
                Path::new("<open handle>"),
                format!(
                    "GetFileInformationByHandleEx: {}",
                    std::io::Error::last_os_error()
                ),
            ));
        }
        Ok(StandardInfo {
            allocation_size: u64::try_from(raw.allocation_size).unwrap_or(0),
            end_of_file: u64::try_from(raw.end_of_file).unwrap_or(0),
            link_count: raw.number_of_links,
            delete_pending: raw.delete_pending != 0,
            is_directory: raw.directory != 0,
        })
    }

    pub(super) fn preallocate(file: &File, size: u64) -> Result<()> {
        let len = i64::try_from(size).map_err(|_| {
            probe_error(
                Path::new("<open handle>"),
                format!("preallocation size {size} out of range"),
            )
        })?;
        let mut info: FILE_ALLOCATION_INFO = unsafe { mem::zeroed() };
        unsafe {
            *info.AllocationSize.QuadPart_mut() = len;
        }
        let class: FILE_INFO_BY_HANDLE_CLASS = FileAllocationInfo;
        let ok = unsafe {
            SetFileInformationByHandle(
                file.as_raw_handle() as HANDLE,
                class,
                std::ptr::from_mut(&mut info).cast(),
                mem::size_of::<FILE_ALLOCATION_INFO>() as DWORD,
            )
        };
        if ok == 0 {
            return Err(probe_error(
                Path::new("<open handle>"),
                format!(
                    "SetFileInformationByHandle: {}",
                    std::io::Error::last_os_error()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(windows)]
impl Platform for WindowsPlatform {
    fn cluster_size(&self, path: &Path) -> Result<u64> {
        windows_impl::cluster_size(path)
    }

    fn standard_info(&self, file: &File) -> Result<StandardInfo> {
        windows_impl::standard_info(file)
    }

    fn preallocate(&self, file: &File, size: u64) -> Result<()> {
        windows_impl::preallocate(file, size)
    }

    fn mount_dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
