//! Snapshot store: full world copies taken at admin operations.
//!
//! One document per snapshot under `snapshots/`, named by ID. Only the
//! newest `capacity` snapshots are kept; the session prunes older ones once
//! the operation that created a snapshot has committed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sengoku_engine::domain::World;
use sengoku_engine::hashing::canonical_hash;
use sengoku_engine::RULES_VERSION;

use crate::error::StoreError;
use crate::snapshot_codec::{decode_snapshot, SnapshotError};
use crate::store::write_json_atomic;

const ID_PREFIX: &str = "snap-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataSnapshot {
    pub id: String,
    /// Operation that triggered the snapshot, if any.
    pub operation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub year: u32,
    pub rules_version: u32,
    /// Canonical hash of `world`.
    pub hash: String,
    pub world: World,
}

/// Listing entry without the world payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub operation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub year: u32,
    pub hash: String,
}

impl From<&DataSnapshot> for SnapshotSummary {
    fn from(s: &DataSnapshot) -> Self {
        Self {
            id: s.id.clone(),
            operation_id: s.operation_id.clone(),
            created_at: s.created_at,
            year: s.year,
            hash: s.hash.clone(),
        }
    }
}

/// `snap-000042` → 42. Only the exact canonical form is a snapshot ID.
fn serial_of(id: &str) -> Option<u64> {
    let serial: u64 = id.strip_prefix(ID_PREFIX)?.parse().ok()?;
    (id == snapshot_id(serial)).then_some(serial)
}

fn snapshot_id(serial: u64) -> String {
    format!("{ID_PREFIX}{serial:06}")
}

#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    capacity: usize,
    next_serial: u64,
}

impl SnapshotStore {
    pub fn open(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let next_serial = scan_serials(&dir)?.last().map_or(1, |s| s + 1);
        Ok(Self {
            dir,
            capacity,
            next_serial,
        })
    }

    fn path_for(&self, serial: u64) -> PathBuf {
        self.dir.join(format!("{}.json", snapshot_id(serial)))
    }

    /// Write a snapshot of `world`. Nothing is pruned until `prune` runs,
    /// so an uncommitted snapshot can still be discarded.
    pub fn create(
        &mut self,
        world: &World,
        operation_id: Option<&str>,
    ) -> Result<DataSnapshot, SnapshotError> {
        let serial = self.next_serial;
        let snapshot = DataSnapshot {
            id: snapshot_id(serial),
            operation_id: operation_id.map(str::to_string),
            created_at: Utc::now(),
            year: world.current_year(),
            rules_version: RULES_VERSION,
            hash: canonical_hash(world).map_err(SnapshotError::Serialization)?,
            world: world.clone(),
        };
        write_json_atomic(&self.path_for(serial), &snapshot)?;
        self.next_serial += 1;
        info!(id = %snapshot.id, year = snapshot.year, "snapshot created");
        Ok(snapshot)
    }

    /// Delete a snapshot whose operation did not commit.
    pub fn discard(&self, id: &str) -> Result<(), StoreError> {
        let Some(serial) = serial_of(id) else {
            return Ok(());
        };
        let path = self.path_for(serial);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(id, "discarded uncommitted snapshot");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Raw snapshot document; `None` for unknown or malformed IDs.
    pub fn load_document(&self, id: &str) -> Result<Option<String>, StoreError> {
        let Some(serial) = serial_of(id) else {
            return Ok(None);
        };
        let path = self.path_for(serial);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Load and decode by ID, without verification.
    pub fn load(&self, id: &str) -> Result<Option<DataSnapshot>, SnapshotError> {
        match self.load_document(id)? {
            Some(json) => decode_snapshot(&json).map(Some),
            None => Ok(None),
        }
    }

    /// Stored snapshots, oldest first.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>, SnapshotError> {
        let mut out = Vec::new();
        for serial in scan_serials(&self.dir)? {
            if let Some(snapshot) = self.load(&snapshot_id(serial))? {
                out.push(SnapshotSummary::from(&snapshot));
            }
        }
        Ok(out)
    }

    /// Delete the oldest snapshots beyond capacity; returns how many.
    pub fn prune(&self) -> Result<usize, StoreError> {
        let serials = scan_serials(&self.dir)?;
        let excess = serials.len().saturating_sub(self.capacity);
        for serial in &serials[..excess] {
            let path = self.path_for(*serial);
            fs::remove_file(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "pruned snapshot");
        }
        if excess > 0 {
            info!(removed = excess, kept = self.capacity, "pruned old snapshots");
        }
        Ok(excess)
    }
}

/// Serials of the snapshot files in `dir`, ascending.
fn scan_serials(dir: &Path) -> Result<Vec<u64>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut serials = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        if let Some(serial) = name
            .to_string_lossy()
            .strip_suffix(".json")
            .and_then(serial_of)
        {
            serials.push(serial);
        }
    }
    serials.sort_unstable();
    Ok(serials)
}
