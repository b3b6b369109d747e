//! Plain-text results log: one summary line per scenario.
//!
//! Every line is flushed before the next scenario starts, so a crash mid-run
//! still leaves a valid partial log.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::errors::{HarnessError, Result};

/// Line-oriented results log, recreated fresh for each run.
#[derive(Debug)]
pub struct ResultsLog {
    path: PathBuf,
    file: File,
}

impl ResultsLog {
    /// Create (truncate) the log at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one newline-terminated summary line and flush it to disk.
    pub fn record(&mut self, line: &str) -> Result<()> {
        let write = |f: &mut File| -> std::io::Result<()> {
            f.write_all(line.as_bytes())?;
            f.write_all(b"\n")?;
            f.flush()
        };
        write(&mut self.file).map_err(|e| HarnessError::io(&self.path, e))
    }
}
