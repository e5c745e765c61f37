//! Runtime failures.
//!
//! Kernel rejections stay `LedgerError`; everything the runtime itself can
//! get wrong (disk, encoding, corrupt documents) is a `RuntimeError`.

use std::path::PathBuf;

use thiserror::Error;

use sengoku_engine::engine::EngineError;
use sengoku_engine::error::LedgerError;
use sengoku_engine::invariants::InvariantViolation;

use crate::config::ConfigError;
use crate::snapshot_codec::SnapshotError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Outcome of a session call that did not commit.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The kernel refused the command; nothing changed.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(e) => SessionError::Rejected(e),
            EngineError::Invariant(v) => SessionError::Runtime(RuntimeError::Invariant(v)),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Runtime(err.into())
    }
}

impl From<SnapshotError> for SessionError {
    fn from(err: SnapshotError) -> Self {
        SessionError::Runtime(err.into())
    }
}
