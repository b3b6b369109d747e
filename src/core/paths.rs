//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Extended-length path prefix accepted by the storage tools' device arguments.
pub const EXTENDED_PREFIX: &str = r"\\?\";

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    // Try filesystem resolution first (handles symlinks).
    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    // Fallback: syntactic normalization.
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Convert a local path to the extended-length (`\\?\`) device form.
///
/// Only drive-absolute paths (`X:...`) are prefixed; POSIX-style device paths
/// are passed through unchanged, as are paths already in extended form.
#[must_use]
pub fn extended_length(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text.starts_with(EXTENDED_PREFIX) || !has_drive_prefix(&text) {
        return path.to_path_buf();
    }
    PathBuf::from(format!("{EXTENDED_PREFIX}{text}"))
}

fn has_drive_prefix(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}
