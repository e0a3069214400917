//! Content-addressed fingerprints.
//!
//! A fingerprint is the BLAKE3 digest of an artifact's ciphertext, truncated
//! to the configured width. Width `w` bytes gives a birthday bound of roughly
//! `n^2 / 2^(8w + 1)` for `n` entries: 16 bytes keeps a billion entries below
//! 1e-18, while 8 bytes reaches even odds near 4e9 entries and is only fit
//! for demos.

use crate::error::{Result, VaultError};
use crate::types::Fingerprint;

pub const MIN_FINGERPRINT_BYTES: usize = 8;
pub const MAX_FINGERPRINT_BYTES: usize = 32;
pub const DEFAULT_FINGERPRINT_BYTES: usize = 16;

pub fn check_width(width: usize) -> Result<()> {
    if !(MIN_FINGERPRINT_BYTES..=MAX_FINGERPRINT_BYTES).contains(&width) {
        return Err(VaultError::Config(format!(
            "fingerprint width must be {MIN_FINGERPRINT_BYTES}..={MAX_FINGERPRINT_BYTES} bytes, got {width}"
        )));
    }
    Ok(())
}

/// Derive the lookup fingerprint for a ciphertext.
pub fn fingerprint(ciphertext: &[u8], width: usize) -> Fingerprint {
    let digest = blake3::hash(ciphertext);
    let width = width.clamp(MIN_FINGERPRINT_BYTES, MAX_FINGERPRINT_BYTES);
    Fingerprint::from_digest(&digest.as_bytes()[..width])
}
