//! Threshold secret sharing of data keys.
//!
//! Splitting is a pluggable capability. The in-process GF(2^8) backend is
//! always compiled in; the `sharks` backend is an alternate implementation
//! behind the `sharks-backend` feature.
//!
//! `combine` has no way to verify its output. A share with a flipped byte
//! still interpolates to *some* key, and the mistake only shows up when the
//! envelope tag fails to verify. Callers must read an integrity failure
//! after a successful combine as evidence of bad shares.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, VaultError};

pub mod gf256;
#[cfg(feature = "sharks-backend")]
pub mod sharks_backend;

pub use gf256::Gf256Splitter;
#[cfg(feature = "sharks-backend")]
pub use sharks_backend::SharksSplitter;

/// Smallest threshold accepted by the vault.
pub const MIN_THRESHOLD: u8 = 2;

/// One point of the sharing polynomial: x-coordinate `index`, one y-value per secret byte.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    pub index: u8,
    pub data: Vec<u8>,
}

impl KeyShare {
    pub fn new(index: u8, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// `index || data`
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(1 + self.data.len()));
        bytes.push(self.index);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&index, data)) if index != 0 && !data.is_empty() => {
                Ok(Self { index, data: data.to_vec() })
            }
            Some((&0, _)) => Err(VaultError::MalformedShare("share index cannot be 0".into())),
            _ => Err(VaultError::MalformedShare(format!(
                "share must hold an index and data, got {} bytes",
                bytes.len()
            ))),
        }
    }
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("index", &self.index)
            .field("data", &"[REDACTED]")
            .finish()
    }
}

/// Splits a secret into `parts` shares, any `threshold` of which recover it.
pub trait ThresholdSplitter: Send + Sync {
    /// Stable backend name, recorded on every vault entry.
    fn name(&self) -> &'static str;

    fn split(&self, secret: &[u8], threshold: u8, parts: u8) -> Result<Vec<KeyShare>>;

    /// Interpolate the secret. Fails with `InsufficientShares` below `threshold`
    /// and with `ShareCombineFailed` on structurally inconsistent input.
    fn combine(&self, shares: &[KeyShare], threshold: u8) -> Result<Zeroizing<Vec<u8>>>;
}

/// Which splitter implementation a vault runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterBackend {
    #[default]
    Gf256,
    Sharks,
}

impl std::str::FromStr for SplitterBackend {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gf256" => Ok(SplitterBackend::Gf256),
            "sharks" => Ok(SplitterBackend::Sharks),
            other => Err(VaultError::Config(format!(
                "unknown splitter backend {other:?} (expected gf256 | sharks)"
            ))),
        }
    }
}

/// Resolve a backend, failing fast when it is not compiled into this build.
pub fn splitter_for(backend: SplitterBackend) -> Result<Arc<dyn ThresholdSplitter>> {
    match backend {
        SplitterBackend::Gf256 => Ok(Arc::new(Gf256Splitter)),
        #[cfg(feature = "sharks-backend")]
        SplitterBackend::Sharks => Ok(Arc::new(SharksSplitter)),
        #[cfg(not(feature = "sharks-backend"))]
        SplitterBackend::Sharks => Err(VaultError::SecretSharingBackendUnavailable(
            "the sharks backend is not compiled in; rebuild with `--features sharks-backend` \
             or set QUORUM_SPLITTER=gf256"
                .into(),
        )),
    }
}

/// Shared policy check for every backend.
pub fn check_policy(threshold: u8, parts: u8) -> Result<()> {
    if threshold < MIN_THRESHOLD {
        return Err(VaultError::InvalidPolicy(format!(
            "threshold must be at least {MIN_THRESHOLD}, got {threshold}"
        )));
    }
    if threshold > parts {
        return Err(VaultError::InvalidPolicy(format!(
            "threshold {threshold} exceeds parts {parts}"
        )));
    }
    Ok(())
}

/// Structural validation before interpolation: drops exact duplicates and
/// rejects index 0, conflicting duplicates and ragged lengths.
pub(crate) fn normalize_shares(shares: &[KeyShare], threshold: u8) -> Result<Vec<&KeyShare>> {
    if shares.len() < threshold as usize {
        return Err(VaultError::InsufficientShares {
            required: threshold as usize,
            provided: shares.len(),
        });
    }

    let mut by_index: BTreeMap<u8, &KeyShare> = BTreeMap::new();
    for share in shares {
        if share.index == 0 {
            return Err(VaultError::ShareCombineFailed("share index cannot be 0".into()));
        }
        match by_index.get(&share.index) {
            Some(existing) if existing.data != share.data => {
                return Err(VaultError::ShareCombineFailed(format!(
                    "conflicting shares for index {}",
                    share.index
                )));
            }
            Some(_) => {}
            None => {
                by_index.insert(share.index, share);
            }
        }
    }

    if by_index.len() < threshold as usize {
        return Err(VaultError::InsufficientShares {
            required: threshold as usize,
            provided: by_index.len(),
        });
    }

    let len = by_index.values().next().map_or(0, |s| s.data.len());
    if len == 0 || by_index.values().any(|s| s.data.len() != len) {
        return Err(VaultError::ShareCombineFailed("shares have mismatched lengths".into()));
    }

    Ok(by_index.into_values().collect())
}
