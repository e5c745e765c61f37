//! Canonical hashing of a world.
//!
//! Collections are keyed `BTreeMap`s and every struct has a fixed field
//! order, so the compact JSON encoding is already deterministic. The rules
//! version goes first so a hash binds the world to the rules that built it.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::World;
use crate::RULES_VERSION;

/// Compact UTF-8 JSON: `{"rulesVersion": .., "world": ..}`.
pub fn canonical_serialize(world: &World) -> Result<Vec<u8>, serde_json::Error> {
    let mut root = Map::new();
    root.insert("rulesVersion".to_string(), Value::from(RULES_VERSION));
    root.insert("world".to_string(), serde_json::to_value(world)?);
    serde_json::to_vec(&Value::Object(root))
}

/// Lowercase hex SHA-256 of `canonical_serialize`.
pub fn canonical_hash(world: &World) -> Result<String, serde_json::Error> {
    Ok(hex_digest(&canonical_serialize(world)?))
}

pub fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
