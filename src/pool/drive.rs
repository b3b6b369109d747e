//! Mount-identifier allocation: first unused drive letter in D–Z.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::errors::{HarnessError, Result};
use crate::platform::pal::Platform;

/// First letter considered for pool mounts (A–C are reserved by convention).
pub const FIRST_LETTER: char = 'D';
/// Last letter in the identifier space.
pub const LAST_LETTER: char = 'Z';

/// How a drive letter maps to a mount path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveNamespace {
    /// Windows drive namespace: letter `X` mounts at `X:\`.
    Letters,
    /// POSIX-style namespace: letter `X` mounts at `<root>/X`.
    Under(PathBuf),
}

impl DriveNamespace {
    /// Mount path for a letter in this namespace.
    #[must_use]
    pub fn mount_path(&self, letter: char) -> PathBuf {
        match self {
            Self::Letters => PathBuf::from(format!("{letter}:\\")),
            Self::Under(root) => root.join(letter.to_string()),
        }
    }

    /// Filesystem-option key the external tool expects for an explicit mount.
    #[must_use]
    pub const fn option_key(&self) -> &'static str {
        match self {
            Self::Letters => "driveletter",
            Self::Under(_) => "mountpoint",
        }
    }

    /// Filesystem-option value selecting `letter` in this namespace.
    #[must_use]
    pub fn option_value(&self, letter: char) -> String {
        match self {
            Self::Letters => letter.to_string(),
            Self::Under(_) => self.mount_path(letter).to_string_lossy().into_owned(),
        }
    }
}

/// An allocated (but not reserved) mount identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSlot {
    /// The letter, in `D..=Z`.
    pub letter: char,
    /// The mount path the letter maps to.
    pub mount_path: PathBuf,
}

/// Scans the identifier space for the next unused mount point.
///
/// Assignment is not reserved in advance, so the allocator must be re-queried
/// after every pool creation or destruction; the harness is single-threaded,
/// so there is no race to guard against.
pub struct DriveLetterAllocator {
    platform: Arc<dyn Platform>,
    namespace: DriveNamespace,
}

impl DriveLetterAllocator {
    /// Allocator probing through `platform` in the given namespace.
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, namespace: DriveNamespace) -> Self {
        Self {
            platform,
            namespace,
        }
    }

    /// The namespace letters are mapped through.
    #[must_use]
    pub const fn namespace(&self) -> &DriveNamespace {
        &self.namespace
    }

    /// First identifier in D–Z whose mount path is not an existing directory.
    ///
    /// Performs no side effects; fails with `ResourceExhausted` when every
    /// identifier is occupied.
    pub fn next_free(&self) -> Result<DriveSlot> {
        for letter in FIRST_LETTER..=LAST_LETTER {
            let mount_path = self.namespace.mount_path(letter);
            if !self.platform.mount_dir_exists(&mount_path) {
                return Ok(DriveSlot { letter, mount_path });
            }
        }
        Err(HarnessError::ResourceExhausted {
            details: format!("no free drive letter in {FIRST_LETTER}-{LAST_LETTER}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::pal::StandardInfo;
    use std::collections::HashSet;
    use std::fs::File;
    use std::path::Path;
    use std::sync::Mutex;

    /// Platform fake with a scripted set of occupied mount directories.
    struct FakeMounts {
        occupied: Mutex<HashSet<PathBuf>>,
    }

    impl FakeMounts {
        fn occupying<I: IntoIterator<Item = PathBuf>>(paths: I) -> Arc<Self> {
            Arc::new(Self {
                occupied: Mutex::new(paths.into_iter().collect()),
            })
        }
    }

    impl Platform for FakeMounts {
        fn cluster_size(&self, _path: &Path) -> Result<u64> {
            unreachable!("allocator never queries cluster size")
        }
        fn standard_info(&self, _file: &File) -> Result<StandardInfo> {
            unreachable!()
        }
        fn preallocate(&self, _file: &File, _size: u64) -> Result<()> {
            unreachable!()
        }
        fn mount_dir_exists(&self, path: &Path) -> bool {
            self.occupied.lock().unwrap().contains(path)
        }
    }

    #[test]
    fn letters_namespace_paths() {
        let ns = DriveNamespace::Letters;
        assert_eq!(ns.mount_path('D'), PathBuf::from("D:\\"));
        assert_eq!(ns.option_key(), "driveletter");
        assert_eq!(ns.option_value('D'), "D");
    }

    #[test]
    fn under_namespace_paths() {
        let ns = DriveNamespace::Under(PathBuf::from("/mnt/zph"));
        assert_eq!(ns.mount_path('E'), PathBuf::from("/mnt/zph/E"));
        assert_eq!(ns.option_key(), "mountpoint");
        assert_eq!(ns.option_value('E'), "/mnt/zph/E");
    }

    #[test]
    fn returns_first_unused_letter() {
        let ns = DriveNamespace::Letters;
        let platform = FakeMounts::occupying([ns.mount_path('D'), ns.mount_path('E')]);
        let alloc = DriveLetterAllocator::new(platform, ns);

        let slot = alloc.next_free().unwrap();
        assert_eq!(slot.letter, 'F');
        assert_eq!(slot.mount_path, PathBuf::from("F:\\"));
    }

    #[test]
    fn skips_gaps_consistently() {
        let ns = DriveNamespace::Letters;
        let platform = FakeMounts::occupying([ns.mount_path('D'), ns.mount_path('F')]);
        let alloc = DriveLetterAllocator::new(platform, ns);
        assert_eq!(alloc.next_free().unwrap().letter, 'E');
    }

    #[test]
    fn exhaustion_is_an_error_with_no_side_effects() {
        let ns = DriveNamespace::Letters;
        let all: Vec<PathBuf> = (FIRST_LETTER..=LAST_LETTER)
            .map(|l| ns.mount_path(l))
            .collect();
        let platform = FakeMounts::occupying(all.clone());
        let alloc = DriveLetterAllocator::new(Arc::clone(&platform) as Arc<dyn Platform>, ns);

        let err = alloc.next_free().unwrap_err();
        assert_eq!(err.code(), "ZPH-2001");
        assert_eq!(platform.occupied.lock().unwrap().len(), all.len());
    }

    #[test]
    fn freed_letter_is_reused_on_requery() {
        let ns = DriveNamespace::Letters;
        let platform = FakeMounts::occupying([ns.mount_path('D')]);
        let alloc =
            DriveLetterAllocator::new(Arc::clone(&platform) as Arc<dyn Platform>, ns.clone());

        assert_eq!(alloc.next_free().unwrap().letter, 'E');
        platform.occupied.lock().unwrap().remove(&ns.mount_path('D'));
        assert_eq!(alloc.next_free().unwrap().letter, 'D');
    }
}
