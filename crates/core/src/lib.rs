//! Functional core for the todos service.
//!
//! Everything in this crate is pure: record types, request-body preparation,
//! update merging, the storage gateway traits and provisioning planning.
//! I/O lives in the `todos` binary crate.

pub mod provision;
pub mod storage;
pub mod todo;
