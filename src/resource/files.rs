//! Backing-file and key-file acquisition on a resource scope.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::core::errors::{HarnessError, Result};
use crate::core::paths::extended_length;
use crate::resource::scope::ResourceScope;

pub(crate) fn remove_file_teardown(path: PathBuf) -> impl FnOnce() -> Result<()> {
    move || match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        // Already gone: release is idempotent.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::io(&path, e)),
    }
}

/// Allocate a sparse file of exactly `size` bytes, released when the scope exits.
pub fn backing_file(scope: &mut ResourceScope, path: &Path, size: u64) -> Result<PathBuf> {
    let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    scope.defer(remove_file_teardown(path.to_path_buf()));
    file.set_len(size).map_err(|e| HarnessError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// Allocate `count` numbered backing files (`test01.dat`, `test02.dat`, ...)
/// in `dir`, all released with the scope.
pub fn backing_files(
    scope: &mut ResourceScope,
    dir: &Path,
    count: usize,
    size: u64,
) -> Result<Vec<PathBuf>> {
    (1..=count)
        .map(|n| backing_file(scope, &dir.join(format!("test{n:02}.dat")), size))
        .collect()
}

/// Write `size` bytes of fresh random key material, released with the scope.
pub fn random_key_file(scope: &mut ResourceScope, path: &Path, size: usize) -> Result<PathBuf> {
    let mut key = vec![0u8; size];
    rand::rng().fill_bytes(&mut key);

    let mut file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    scope.defer(remove_file_teardown(path.to_path_buf()));
    file.write_all(&key).map_err(|e| HarnessError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// `file://` URI for a key file, in the forward-slash form the storage tool's
/// `keylocation` property accepts.
#[must_use]
pub fn key_file_uri(path: &Path) -> String {
    let device = extended_length(path);
    format!("file://{}", device.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::scope::run_scope;

    #[test]
    fn backing_file_has_exact_size_then_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test01.dat");
        let size = 4 * crate::core::units::MIB;

        let observed = run_scope(|scope| {
            let created = backing_file(scope, &path, size)?;
            Ok(fs::metadata(&created).unwrap().len())
        })
        .unwrap();

        assert_eq!(observed, size);
        assert!(!path.exists(), "backing file must be gone after the scope");
    }

    #[test]
    fn backing_files_are_numbered_and_all_released() {
        let dir = tempfile::tempdir().unwrap();
        run_scope(|scope| {
            let files = backing_files(scope, dir.path(), 3, crate::core::units::MIB)?;
            assert_eq!(files.len(), 3);
            assert!(files[0].ends_with("test01.dat"));
            assert!(files[2].ends_with("test03.dat"));
            for f in &files {
                assert!(f.exists());
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_scope_still_removes_backing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test01.dat");
        let result: crate::core::errors::Result<()> = run_scope(|scope| {
            backing_file(scope, &path, crate::core::units::MIB)?;
            Err(crate::core::errors::HarnessError::ResourceExhausted {
                details: "forced".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn key_file_holds_requested_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key01.key");
        run_scope(|scope| {
            let key = random_key_file(scope, &path, 32)?;
            assert_eq!(fs::metadata(&key).unwrap().len(), 32);
            Ok(())
        })
        .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn key_uri_uses_forward_slashes() {
        let uri = key_file_uri(Path::new(r"C:\keys\key01.key"));
        assert_eq!(uri, "file:////?/C:/keys/key01.key");
    }

    #[test]
    fn key_uri_posix_path_untouched() {
        let uri = key_file_uri(Path::new("/keys/key01.key"));
        assert_eq!(uri, "file:///keys/key01.key");
    }
}
