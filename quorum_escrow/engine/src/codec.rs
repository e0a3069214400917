//! Canonical payload encoding.
//!
//! Payloads are arbitrary JSON values. The encoded form is compact JSON with
//! every object's keys in sorted order, so equal values always produce equal
//! bytes. Those bytes feed both the cipher and the content hash.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Result, VaultError};
use crate::types::ContentHash;

/// Encode a payload into its canonical byte form.
pub fn encode(payload: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(&canonicalize(payload))
        .map_err(|e| VaultError::MalformedPayload(format!("Encoding failed: {e}")))
}

/// Decode canonical bytes back into a payload.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .map_err(|e| VaultError::MalformedPayload(format!("Decoding failed: {e}")))
}

/// Hex SHA-256 over encoded payload bytes.
pub fn content_hash(encoded: &[u8]) -> ContentHash {
    ContentHash(hex::encode(Sha256::digest(encoded)))
}

// Rebuilds objects with sorted keys. serde_json's default map is already ordered,
// but `preserve_order` may be switched on by another crate in the graph.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
