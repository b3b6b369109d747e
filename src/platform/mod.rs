//! OS abstraction layer.

pub mod pal;
