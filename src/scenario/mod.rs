//! Scenario execution: external test programs, their pass/fail protocol, and
//! the persisted results log.

pub mod log;
pub mod runner;
pub mod tap;
