#![forbid(unsafe_code)]

//! Sengoku runtime.
//!
//! Wraps the kernel with file persistence, the operation log, snapshots
//! and a lock-guarded session. No game rules live here; every mutation
//! goes through `GameEngine::apply`.

pub mod config;
pub mod error;
pub mod operation_log;
pub mod response;
pub mod session;
pub mod snapshot;
pub mod snapshot_codec;
pub mod store;
