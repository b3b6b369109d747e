//! Scoped resource primitives: acquisition scopes, backing files, key files.

pub mod files;
pub mod scope;
