//! Run logging: leveled console output plus an optional JSONL event log.

pub mod console;
pub mod jsonl;
