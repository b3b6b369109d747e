//! Pool management: tool discovery, mount identifiers, scoped lifecycle,
//! and mount-state listing.

pub mod context;
pub mod drive;
pub mod lifecycle;
pub mod mounts;
