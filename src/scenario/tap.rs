//! Line-oriented pass/fail micro-protocol emitted by scenario binaries.
//!
//! Scenarios that report sub-results print one line per sub-test starting with
//! `ok` or `not ok`. Anything else on stdout is narrative and is kept as an
//! `Other` record rather than rejected, since scenario output is not under the
//! harness's control.

use std::fmt;

/// One classified line of scenario stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapLine {
    /// A passing sub-result (`ok ...`).
    Ok(String),
    /// A failing sub-result (`not ok ...`).
    NotOk(String),
    /// Narrative output that is not part of the protocol.
    Other(String),
}

impl TapLine {
    /// Raw text of the line.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Ok(s) | Self::NotOk(s) | Self::Other(s) => s,
        }
    }
}

/// Pass/fail counts over the protocol lines of one scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapTally {
    /// Sub-results that passed.
    pub passed: u32,
    /// Sub-results that failed.
    pub failed: u32,
}

impl TapTally {
    /// Total sub-results reported.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.passed + self.failed
    }

    /// True when the scenario reported sub-results at all.
    #[must_use]
    pub const fn has_results(&self) -> bool {
        self.total() > 0
    }

    /// True when nothing failed (vacuously true with no sub-results).
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for TapTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.passed, self.total())
    }
}

/// Classify every line of `stdout` into typed records.
#[must_use]
pub fn parse(stdout: &str) -> Vec<TapLine> {
    stdout
        .lines()
        .map(|line| {
            if line.starts_with("not ok") {
                TapLine::NotOk(line.to_string())
            } else if line.starts_with("ok") {
                TapLine::Ok(line.to_string())
            } else {
                TapLine::Other(line.to_string())
            }
        })
        .collect()
}

/// Count pass/fail records.
#[must_use]
pub fn tally(lines: &[TapLine]) -> TapTally {
    let mut t = TapTally::default();
    for line in lines {
        match line {
            TapLine::Ok(_) => t.passed += 1,
            TapLine::NotOk(_) => t.failed += 1,
            TapLine::Other(_) => {}
        }
    }
    t
}
