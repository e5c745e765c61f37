//! Snapshot codec: `DataSnapshot` documents to and from JSON.
//!
//! - `decode_snapshot`:  JSON string → snapshot (strict, unknown fields rejected)
//! - `verify_snapshot_hash`: recompute the world hash and compare
//! - `restore_snapshot`: decode + hash check + invariant validation
//!
//! Encoding is plain serde; `SnapshotStore::create` writes the documents.

use thiserror::Error;

use sengoku_engine::hashing::canonical_hash;
use sengoku_engine::invariants::{try_validate_invariants, InvariantViolation};

use crate::error::StoreError;
use crate::snapshot::DataSnapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot encode snapshot: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("cannot decode snapshot: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("snapshot {id} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        id: String,
        stored: String,
        computed: String,
    },
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Strict decode. No hash or invariant checks; see `restore_snapshot`.
pub fn decode_snapshot(json: &str) -> Result<DataSnapshot, SnapshotError> {
    serde_json::from_str(json).map_err(SnapshotError::Deserialization)
}

pub fn verify_snapshot_hash(snapshot: &DataSnapshot) -> Result<(), SnapshotError> {
    let computed = canonical_hash(&snapshot.world).map_err(SnapshotError::Serialization)?;
    if computed == snapshot.hash {
        Ok(())
    } else {
        Err(SnapshotError::HashMismatch {
            id: snapshot.id.clone(),
            stored: snapshot.hash.clone(),
            computed,
        })
    }
}

/// Decode a snapshot document, provided its world still matches its hash
/// and passes every invariant.
pub fn restore_snapshot(json: &str, max_action_points: u8) -> Result<DataSnapshot, SnapshotError> {
    let snapshot = decode_snapshot(json)?;
    verify_snapshot_hash(&snapshot)?;
    try_validate_invariants(&snapshot.world, max_action_points)?;
    Ok(snapshot)
}
