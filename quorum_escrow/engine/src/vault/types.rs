use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binder::BindingMode;
use crate::crypto::CipherArtifact;
use crate::types::{ContentHash, Fingerprint, Role};

/// Wrapped share issued to one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub role: Role,
    pub wrapped_share: String,
}

/// Everything needed to reconstruct a payload, given a quorum of shares.
///
/// This is also the persisted layout: ciphertext, nonce, algorithm, format
/// version, content hash, threshold and the role→wrapped-share map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub fingerprint: Fingerprint,
    pub artifact: CipherArtifact,
    pub content_hash: ContentHash,
    pub threshold: u8,
    pub parts: u8,
    pub binding: BindingMode,
    /// Name of the splitter backend that produced the shares.
    pub splitter: String,
    pub created_at: DateTime<Utc>,
    pub shares: BTreeMap<Role, ShareRecord>,
}

impl VaultEntry {
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.shares.keys()
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            fingerprint: self.fingerprint.clone(),
            content_hash: self.content_hash.clone(),
            threshold: self.threshold,
            parts: self.parts,
            roles: self.roles().cloned().collect(),
            binding: self.binding,
            created_at: self.created_at,
        }
    }
}

/// Returned from `create`: the lookup key and the shares to hand out.
#[derive(Debug, Clone, Serialize)]
pub struct CreateReceipt {
    pub fingerprint: Fingerprint,
    pub content_hash: ContentHash,
    pub shares: BTreeMap<Role, String>,
}

/// Returned from `reconstruct`.
#[derive(Debug, Clone, Serialize)]
pub struct Reconstruction {
    pub payload: Value,
    /// Hash recomputed from the decrypted payload.
    pub content_hash: ContentHash,
    /// Whether the recomputed hash equals the one recorded at creation.
    pub hash_matches: bool,
}

/// Entry metadata safe to list: no ciphertext, no shares.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub fingerprint: Fingerprint,
    pub content_hash: ContentHash,
    pub threshold: u8,
    pub parts: u8,
    pub roles: Vec<Role>,
    pub binding: BindingMode,
    pub created_at: DateTime<Utc>,
}
