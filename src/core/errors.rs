//! ZPH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Top-level error type for the pool harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("[ZPH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ZPH-1002] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[ZPH-1101] tool `{name}` not found under {search_root}")]
    ToolNotFound { name: String, search_root: PathBuf },

    #[error("[ZPH-2001] resource exhausted: {details}")]
    ResourceExhausted { details: String },

    #[error("[ZPH-2002] pool `{pool}` creation failed (exit {exit_code}): {stderr}")]
    CreationFailed {
        pool: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("[ZPH-2003] pool `{pool}` destroy failed (exit {exit_code}): {stderr}")]
    TeardownFailed {
        pool: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("[ZPH-2004] pool `{pool}` reported created but {mount_path} never became a directory")]
    MountVerificationFailed { pool: String, mount_path: PathBuf },

    #[error("[ZPH-2005] pool `{pool}` reported destroyed but {mount_path} still exists")]
    TeardownVerificationFailed { pool: String, mount_path: PathBuf },

    #[error("[ZPH-2101] mount listing parse failure at line {line_no}: {line:?}")]
    MountParse { line_no: usize, line: String },

    #[error("[ZPH-2102] `{tool}` failed (exit {exit_code}): {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("[ZPH-2201] metadata probe failure for {path}: {details}")]
    Probe { path: PathBuf, details: String },

    #[error("[ZPH-2301] suite failed: {failed} of {total} checks did not pass")]
    SuiteFailed { failed: usize, total: usize },

    #[error("[ZPH-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ZPH-3002] failed to invoke {program}: {source}")]
    ToolSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ZPH-3101] teardown failure: {cleanup} (while unwinding from: {primary})")]
    Cleanup {
        primary: Box<HarnessError>,
        cleanup: Box<HarnessError>,
    },
}

impl HarnessError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ZPH-1001",
            Self::ConfigParse { .. } => "ZPH-1002",
            Self::ToolNotFound { .. } => "ZPH-1101",
            Self::ResourceExhausted { .. } => "ZPH-2001",
            Self::CreationFailed { .. } => "ZPH-2002",
            Self::TeardownFailed { .. } => "ZPH-2003",
            Self::MountVerificationFailed { .. } => "ZPH-2004",
            Self::TeardownVerificationFailed { .. } => "ZPH-2005",
            Self::MountParse { .. } => "ZPH-2101",
            Self::ToolFailed { .. } => "ZPH-2102",
            Self::Probe { .. } => "ZPH-2201",
            Self::SuiteFailed { .. } => "ZPH-2301",
            Self::Io { .. } => "ZPH-3001",
            Self::ToolSpawn { .. } => "ZPH-3002",
            Self::Cleanup { .. } => "ZPH-3101",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::ToolSpawn { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Combine an in-flight error with one raised during teardown.
    ///
    /// The in-flight error is never discarded: both are carried, with the
    /// original reachable as `primary` all the way down a nested chain.
    #[must_use]
    pub fn during_cleanup(primary: Self, cleanup: Self) -> Self {
        Self::Cleanup {
            primary: Box::new(primary),
            cleanup: Box::new(cleanup),
        }
    }

    /// The error that started the unwind, stripped of any teardown wrapping.
    #[must_use]
    pub fn root_failure(&self) -> &Self {
        match self {
            Self::Cleanup { primary, .. } => primary.root_failure(),
            other => other,
        }
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<HarnessError> {
        vec![
            HarnessError::InvalidConfig {
                details: String::new(),
            },
            HarnessError::ConfigParse {
                context: "",
                details: String::new(),
            },
            HarnessError::ToolNotFound {
                name: "zpool".to_string(),
                search_root: PathBuf::new(),
            },
            HarnessError::ResourceExhausted {
                details: String::new(),
            },
            HarnessError::CreationFailed {
                pool: String::new(),
                exit_code: 1,
                stdout: String::new(),
                stderr: String::new(),
            },
            HarnessError::TeardownFailed {
                pool: String::new(),
                exit_code: 1,
                stdout: String::new(),
                stderr: String::new(),
            },
            HarnessError::MountVerificationFailed {
                pool: String::new(),
                mount_path: PathBuf::new(),
            },
            HarnessError::TeardownVerificationFailed {
                pool: String::new(),
                mount_path: PathBuf::new(),
            },
            HarnessError::MountParse {
                line_no: 0,
                line: String::new(),
            },
            HarnessError::ToolFailed {
                tool: "zfs".to_string(),
                exit_code: 1,
                stderr: String::new(),
            },
            HarnessError::Probe {
                path: PathBuf::new(),
                details: String::new(),
            },
            HarnessError::SuiteFailed {
                failed: 1,
                total: 2,
            },
            HarnessError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            HarnessError::ToolSpawn {
                program: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            HarnessError::during_cleanup(
                HarnessError::ResourceExhausted {
                    details: String::new(),
                },
                HarnessError::Io {
                    path: PathBuf::new(),
                    source: std::io::Error::other("test"),
                },
            ),
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = sample_errors().iter().map(HarnessError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_zph_prefix() {
        for err in &sample_errors() {
            assert!(
                err.code().starts_with("ZPH-"),
                "code {} must start with ZPH-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = HarnessError::CreationFailed {
            pool: "test01".to_string(),
            exit_code: 2,
            stdout: String::new(),
            stderr: "cannot open device".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ZPH-2002"), "missing code: {msg}");
        assert!(msg.contains("test01"), "missing pool name: {msg}");
        assert!(msg.contains("cannot open device"), "missing stderr: {msg}");
    }

    #[test]
    fn cleanup_preserves_primary_error() {
        let primary = HarnessError::MountVerificationFailed {
            pool: "tank".to_string(),
            mount_path: PathBuf::from("D:\\"),
        };
        let cleanup = HarnessError::io(PathBuf::from("x"), std::io::Error::other("unlink failed"));
        let combined = HarnessError::during_cleanup(primary, cleanup);

        let msg = combined.to_string();
        assert!(msg.contains("ZPH-2004"), "primary code lost: {msg}");
        assert!(msg.contains("unlink failed"), "cleanup detail lost: {msg}");
        assert_eq!(combined.root_failure().code(), "ZPH-2004");
    }

    #[test]
    fn nested_cleanup_keeps_root_failure() {
        let root = HarnessError::ResourceExhausted {
            details: "no free drive letter".to_string(),
        };
        let one = HarnessError::during_cleanup(
            root,
            HarnessError::io(PathBuf::from("a"), std::io::Error::other("a")),
        );
        let two = HarnessError::during_cleanup(
            one,
            HarnessError::io(PathBuf::from("b"), std::io::Error::other("b")),
        );
        assert_eq!(two.root_failure().code(), "ZPH-2001");
    }

    #[test]
    fn retryable_classification() {
        assert!(HarnessError::io(PathBuf::new(), std::io::Error::other("x")).is_retryable());
        assert!(
            !HarnessError::ResourceExhausted {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !HarnessError::Probe {
                path: PathBuf::new(),
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: HarnessError = toml_err.into();
        assert_eq!(err.code(), "ZPH-1002");
    }
}
