//! Core types: errors, configuration, units, shared path helpers.

pub mod config;
pub mod errors;
pub mod paths;
pub mod units;
