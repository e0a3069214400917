//! Role-tagged share wrapping.
//!
//! A wrapped share is the opaque string handed to a role-holder. Two modes:
//!
//! - `transport`: base64 of `index || data`. The role label is *not* bound to
//!   the share, so a share presented under another role still unwraps.
//! - `authenticated`: base64 of `index || data || tag`, where the tag is a
//!   BLAKE3 keyed hash over the role and the share under a key derived from
//!   the vault binding secret and the entry fingerprint. A share unwraps only
//!   for the role and entry it was issued to.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::sharing::KeyShare;
use crate::types::{Fingerprint, Role};

const TAG_LEN: usize = blake3::OUT_LEN;
const BINDING_CONTEXT: &str = "quorum-escrow 2024 role-bound share wrapping v1";

/// Wraps and unwraps shares for a named role.
pub trait ShareBinder {
    fn wrap(&self, share: &KeyShare, role: &Role) -> String;
    fn unwrap(&self, wrapped: &str, role: &Role) -> Result<KeyShare>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    #[default]
    Transport,
    Authenticated,
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingMode::Transport => f.write_str("transport"),
            BindingMode::Authenticated => f.write_str("authenticated"),
        }
    }
}

impl std::str::FromStr for BindingMode {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transport" => Ok(BindingMode::Transport),
            "authenticated" => Ok(BindingMode::Authenticated),
            other => Err(VaultError::Config(format!(
                "unknown binding mode {other:?} (expected transport | authenticated)"
            ))),
        }
    }
}

/// Base64 transport encoding. Role is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportBinder;

impl ShareBinder for TransportBinder {
    fn wrap(&self, share: &KeyShare, _role: &Role) -> String {
        STANDARD.encode(share.to_bytes().as_slice())
    }

    fn unwrap(&self, wrapped: &str, _role: &Role) -> Result<KeyShare> {
        let bytes = decode(wrapped)?;
        KeyShare::from_bytes(&bytes)
    }
}

/// MAC-authenticated wrapping scoped to one vault entry.
pub struct AuthenticatedBinder {
    key: Zeroizing<[u8; 32]>,
}

impl AuthenticatedBinder {
    pub fn for_entry(binding_secret: &[u8; 32], fingerprint: &Fingerprint) -> Self {
        let mut material = Zeroizing::new(Vec::with_capacity(32 + fingerprint.as_str().len()));
        material.extend_from_slice(binding_secret);
        material.extend_from_slice(fingerprint.as_str().as_bytes());
        Self { key: Zeroizing::new(blake3::derive_key(BINDING_CONTEXT, &material)) }
    }

    fn tag(&self, share_bytes: &[u8], role: &Role) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&(role.as_str().len() as u64).to_le_bytes());
        hasher.update(role.as_str().as_bytes());
        hasher.update(share_bytes);
        hasher.finalize()
    }
}

impl ShareBinder for AuthenticatedBinder {
    fn wrap(&self, share: &KeyShare, role: &Role) -> String {
        let mut bytes = share.to_bytes();
        let tag = self.tag(&bytes, role);
        bytes.extend_from_slice(tag.as_bytes());
        STANDARD.encode(bytes.as_slice())
    }

    fn unwrap(&self, wrapped: &str, role: &Role) -> Result<KeyShare> {
        let bytes = decode(wrapped)?;
        if bytes.len() <= TAG_LEN {
            return Err(VaultError::MalformedShare("wrapped share is too short".into()));
        }
        let (share_bytes, tag_bytes) = bytes.split_at(bytes.len() - TAG_LEN);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(tag_bytes);

        // blake3::Hash equality is constant-time.
        if self.tag(share_bytes, role) != blake3::Hash::from(tag) {
            return Err(VaultError::MalformedShare(format!(
                "share is not bound to role {role} for this entry"
            )));
        }
        KeyShare::from_bytes(share_bytes)
    }
}

/// Pick the binder an entry was created with.
pub fn binder_for(
    mode: BindingMode,
    binding_secret: Option<&[u8; 32]>,
    fingerprint: &Fingerprint,
) -> Result<Box<dyn ShareBinder>> {
    match mode {
        BindingMode::Transport => Ok(Box::new(TransportBinder)),
        BindingMode::Authenticated => {
            let secret = binding_secret.ok_or_else(|| {
                VaultError::Config("authenticated binding requires a binding secret".into())
            })?;
            Ok(Box::new(AuthenticatedBinder::for_entry(secret, fingerprint)))
        }
    }
}

fn decode(wrapped: &str) -> Result<Zeroizing<Vec<u8>>> {
    STANDARD
        .decode(wrapped.trim())
        .map(Zeroizing::new)
        .map_err(|e| VaultError::MalformedShare(format!("invalid base64: {e}")))
}
