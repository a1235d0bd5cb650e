//! Canonical JSON serialization for deterministic hashing
//!
//! Artifacts are hashed over a canonical rendering: object keys sorted
//! recursively, no whitespace. Two pipelines with equal contents therefore
//! always hash equal, regardless of struct field order.

use serde::Serialize;
use serde_json::{Map, Value};

/// Recursively sort JSON object keys
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }
            Value::Object(sorted)
        }
        Value::Array(elements) => Value::Array(elements.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a value to canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    serde_json::to_string(&canonical)
}

/// Blake3 hash of the canonical JSON representation, hex encoded
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = to_canonical_json(value)?;
    Ok(hash_bytes_hex(json.as_bytes()))
}

/// Blake3 hash of raw bytes, hex encoded
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}
