//! Strict parser for the filesystem-manager's `mount` listing.
//!
//! The listing is line-oriented: a dataset name, whitespace, a mount path.
//! Unrecognized non-empty lines are rejected rather than best-effort split, so
//! a format drift in the external tool is diagnosed instead of silently
//! producing wrong mappings.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::{HarnessError, Result};
use crate::exec::{ToolRunner, to_args};
use crate::pool::context::StorageContext;

static MOUNT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_./-]{1,255}) +(.+?) *$").expect("static pattern"));

/// One dataset → mount-path entry from the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Dataset name as reported by the tool.
    pub dataset: String,
    /// Path the dataset is mounted at.
    pub mount_path: PathBuf,
}

/// Parse a complete `mount` listing into typed entries.
pub fn parse_mount_listing(stdout: &str) -> Result<Vec<MountEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let captures = MOUNT_LINE
            .captures(line)
            .ok_or_else(|| HarnessError::MountParse {
                line_no: idx + 1,
                line: line.to_string(),
            })?;
        entries.push(MountEntry {
            dataset: captures[1].to_string(),
            mount_path: PathBuf::from(&captures[2]),
        });
    }
    Ok(entries)
}

/// Query the live mount table through the filesystem-manager tool.
pub fn list_mounts(ctx: &StorageContext, runner: &dyn ToolRunner) -> Result<Vec<MountEntry>> {
    let out = runner.run(ctx.fs_tool(), &to_args(["mount"]))?;
    if !out.success() {
        return Err(HarnessError::ToolFailed {
            tool: "zfs mount".to_string(),
            exit_code: out.exit_code,
            stderr: out.stderr,
        });
    }
    parse_mount_listing(&out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_drive_letter_listing() {
        let listing = "test01                          H:\\ \r\ntest02             I:\\ \r\n";
        let entries = parse_mount_listing(listing).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].dataset, "test01");
        assert_eq!(entries[0].mount_path, PathBuf::from("H:\\"));
        assert_eq!(entries[1].dataset, "test02");
    }

    #[test]
    fn parses_posix_listing() {
        let listing = "tank/data  /mnt/zph/E\n";
        let entries = parse_mount_listing(listing).unwrap();
        assert_eq!(entries[0].dataset, "tank/data");
        assert_eq!(entries[0].mount_path, PathBuf::from("/mnt/zph/E"));
    }

    #[test]
    fn empty_listing_is_empty() {
        assert!(parse_mount_listing("").unwrap().is_empty());
        assert!(parse_mount_listing("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn rejects_unrecognized_line() {
        let listing = "test01  H:\\\n<<???>> garbage\n";
        let err = parse_mount_listing(listing).unwrap_err();
        assert_eq!(err.code(), "ZPH-2101");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn rejects_name_without_path() {
        let err = parse_mount_listing("loneword\n").unwrap_err();
        assert_eq!(err.code(), "ZPH-2101");
    }

    #[test]
    fn list_mounts_propagates_tool_failure() {
        use crate::exec::testing::ScriptedRunner;

        let dir = tempfile::tempdir().unwrap();
        for name in ["zpool", "zfs", "zdb"] {
            let file = if cfg!(windows) {
                format!("{name}.exe")
            } else {
                name.to_string()
            };
            std::fs::write(dir.path().join(file), b"").unwrap();
        }
        let ctx = StorageContext::locate(dir.path()).unwrap();

        let runner = ScriptedRunner::new();
        runner.push_output(1, "", "internal error");
        let err = list_mounts(&ctx, &runner).unwrap_err();
        assert_eq!(err.code(), "ZPH-2102");
    }
}
