//! Resolved locations of the external storage tools.

use std::path::{Path, PathBuf};

use crate::core::errors::{HarnessError, Result};

/// Immutable record of the three storage-tool binaries.
///
/// Constructed once from a root directory and threaded through every
/// operation; if any tool cannot be located, construction fails and nothing
/// else is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageContext {
    root: PathBuf,
    pool_tool: PathBuf,
    fs_tool: PathBuf,
    debug_tool: PathBuf,
}

impl StorageContext {
    /// Resolve `zpool`, `zfs` and `zdb` under `root`.
    ///
    /// `root` may be an installation directory (`<root>/<tool>`) or a build
    /// tree (`<root>/cmd/<tool>/<tool>`).
    pub fn locate(root: &Path) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            pool_tool: find_tool(root, "zpool")?,
            fs_tool: find_tool(root, "zfs")?,
            debug_tool: find_tool(root, "zdb")?,
        })
    }

    /// Directory the tools were resolved under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pool-manager binary (`zpool`).
    #[must_use]
    pub fn pool_tool(&self) -> &Path {
        &self.pool_tool
    }

    /// Filesystem-manager binary (`zfs`).
    #[must_use]
    pub fn fs_tool(&self) -> &Path {
        &self.fs_tool
    }

    /// Debugger binary (`zdb`).
    #[must_use]
    pub fn debug_tool(&self) -> &Path {
        &self.debug_tool
    }
}

fn tool_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn find_tool(root: &Path, name: &str) -> Result<PathBuf> {
    let file_name = tool_file_name(name);

    let installed = root.join(&file_name);
    if installed.is_file() {
        return Ok(installed);
    }

    let built = root.join("cmd").join(name).join(&file_name);
    if built.is_file() {
        return Ok(built);
    }

    Err(HarnessError::ToolNotFound {
        name: name.to_string(),
        search_root: root.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn tool(name: &str) -> String {
        tool_file_name(name)
    }

    #[test]
    fn locates_installation_layout() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zpool", "zfs", "zdb"] {
            touch(&dir.path().join(tool(name)));
        }

        let ctx = StorageContext::locate(dir.path()).unwrap();
        assert_eq!(ctx.pool_tool(), dir.path().join(tool("zpool")));
        assert_eq!(ctx.fs_tool(), dir.path().join(tool("zfs")));
        assert_eq!(ctx.debug_tool(), dir.path().join(tool("zdb")));
    }

    #[test]
    fn locates_build_tree_layout() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zpool", "zfs", "zdb"] {
            touch(&dir.path().join("cmd").join(name).join(tool(name)));
        }

        let ctx = StorageContext::locate(dir.path()).unwrap();
        assert_eq!(
            ctx.pool_tool(),
            dir.path().join("cmd").join("zpool").join(tool("zpool"))
        );
    }

    #[test]
    fn installation_layout_wins_over_build_tree() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zpool", "zfs", "zdb"] {
            touch(&dir.path().join(tool(name)));
            touch(&dir.path().join("cmd").join(name).join(tool(name)));
        }
        let ctx = StorageContext::locate(dir.path()).unwrap();
        assert_eq!(ctx.pool_tool(), dir.path().join(tool("zpool")));
    }

    #[test]
    fn missing_tool_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(tool("zpool")));
        touch(&dir.path().join(tool("zfs")));
        // zdb intentionally absent.

        let err = StorageContext::locate(dir.path()).unwrap_err();
        assert_eq!(err.code(), "ZPH-1101");
        assert!(err.to_string().contains("zdb"));
    }
}
