//! File-backed document store.
//!
//! Layout under the data directory:
//!
//! ```text
//! factions.json  territories.json  samurai.json  legions.json
//! special_products.json            (JSON arrays)
//! game_state.json                  (object)
//! operations.json                  (capped array, newest first)
//! snapshots/<id>.json              (one document per snapshot)
//! ```
//!
//! Every file is replaced whole: written to a sibling temp file, synced,
//! then renamed over the original.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use sengoku_engine::domain::World;

use crate::error::StoreError;
use crate::operation_log::OperationRecord;

const FACTIONS_FILE: &str = "factions.json";
const TERRITORIES_FILE: &str = "territories.json";
const SAMURAI_FILE: &str = "samurai.json";
const LEGIONS_FILE: &str = "legions.json";
const SPECIAL_PRODUCTS_FILE: &str = "special_products.json";
const GAME_STATE_FILE: &str = "game_state.json";

/// World field name and the file it lives in.
const COLLECTION_FILES: [(&str, &str); 5] = [
    ("factions", FACTIONS_FILE),
    ("territories", TERRITORIES_FILE),
    ("samurai", SAMURAI_FILE),
    ("legions", LEGIONS_FILE),
    ("specialProducts", SPECIAL_PRODUCTS_FILE),
];
pub const OPERATIONS_FILE: &str = "operations.json";
pub const SNAPSHOT_DIR: &str = "snapshots";

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and decode a JSON file; `None` if it does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Write pretty JSON to `path` through a temp file and a rename.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("json.tmp");
    let mut file = File::create(&tmp).map_err(io_error(&tmp))?;
    file.write_all(&content).map_err(io_error(&tmp))?;
    file.sync_all().map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote document");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_DIR)
    }

    /// Load the persisted world, or `None` when nothing has been saved yet.
    /// A missing collection file reads as an empty collection.
    pub fn load_world(&self) -> Result<Option<World>, StoreError> {
        let state_path = self.dir.join(GAME_STATE_FILE);
        let Some(game_state) = read_json::<Value>(&state_path)? else {
            return Ok(None);
        };

        let mut root = Map::new();
        for (key, file) in COLLECTION_FILES {
            let items = read_json::<Value>(&self.dir.join(file))?
                .unwrap_or_else(|| Value::Array(Vec::new()));
            root.insert(key.to_string(), items);
        }
        root.insert("gameState".to_string(), game_state);

        serde_json::from_value(Value::Object(root))
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.dir.clone(),
                source,
            })
    }

    /// Write every collection and the game state.
    pub fn save_world(&self, world: &World) -> Result<(), StoreError> {
        self.write_collection(FACTIONS_FILE, world.factions.values())?;
        self.write_collection(TERRITORIES_FILE, world.territories.values())?;
        self.write_collection(SAMURAI_FILE, world.samurai.values())?;
        self.write_collection(LEGIONS_FILE, world.legions.values())?;
        self.write_collection(SPECIAL_PRODUCTS_FILE, world.special_products.values())?;
        write_json_atomic(&self.dir.join(GAME_STATE_FILE), &world.game_state)
    }

    fn write_collection<'a, T: Serialize + 'a>(
        &self,
        file: &str,
        items: impl Iterator<Item = &'a T>,
    ) -> Result<(), StoreError> {
        let items: Vec<&T> = items.collect();
        write_json_atomic(&self.dir.join(file), &items)
    }

    pub fn load_operations(&self) -> Result<Vec<OperationRecord>, StoreError> {
        Ok(read_json(&self.dir.join(OPERATIONS_FILE))?.unwrap_or_default())
    }

    pub fn save_operations(&self, records: &[OperationRecord]) -> Result<(), StoreError> {
        write_json_atomic(&self.dir.join(OPERATIONS_FILE), records)
    }
}
