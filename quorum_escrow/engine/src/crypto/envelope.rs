//! AES-256-GCM envelope encryption with single-use data keys.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::b64;
use crate::error::{Result, VaultError};

/// Algorithm tag written into every artifact this build produces.
pub const ALGORITHM: &str = "AES-256-GCM";
/// Artifact format version written by this build.
pub const FORMAT_VERSION: u16 = 1;
/// Data key length in bytes (256-bit).
pub const KEY_LEN: usize = 32;
/// GCM standard nonce length.
pub const NONCE_LEN: usize = 12;

/// A single-use 256-bit symmetric key, wiped from memory on drop.
pub struct DataKey(Zeroizing<[u8; KEY_LEN]>);

impl DataKey {
    /// Fresh key from the OS CSPRNG. Never reuse one across artifacts.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        DataKey(key)
    }

    /// Rebuild a key from recovered bytes. A wrong length means the shares did not
    /// belong together, so it is reported as an integrity failure.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(VaultError::IntegrityFailure(format!(
                "recovered key is {} bytes, expected {KEY_LEN}",
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(DataKey(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

/// Encrypted payload plus everything needed to open it with the right key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherArtifact {
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// Associated data authenticated alongside the ciphertext. Unused by default.
    #[serde(default, with = "b64::option", skip_serializing_if = "Option::is_none")]
    pub aad: Option<Vec<u8>>,
    pub alg: String,
    pub version: u16,
}

/// Seal `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &DataKey, aad: Option<&[u8]>) -> Result<CipherArtifact> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload { msg: plaintext, aad: aad.unwrap_or_default() },
        )
        .map_err(|e| VaultError::IntegrityFailure(format!("Encryption failed: {e:?}")))?;

    Ok(CipherArtifact {
        ciphertext,
        nonce: nonce_bytes.to_vec(),
        aad: aad.map(<[u8]>::to_vec),
        alg: ALGORITHM.to_string(),
        version: FORMAT_VERSION,
    })
}

/// Reject artifacts written by an algorithm or format version this build does not speak.
pub fn check_format(artifact: &CipherArtifact) -> Result<()> {
    if artifact.alg != ALGORITHM || artifact.version != FORMAT_VERSION {
        return Err(VaultError::UnsupportedAlgorithm {
            alg: artifact.alg.clone(),
            version: artifact.version,
        });
    }
    Ok(())
}

/// Open an artifact. Fails closed: either the tag verifies and the full plaintext
/// is returned, or nothing is.
pub fn decrypt(artifact: &CipherArtifact, key: &DataKey) -> Result<Zeroizing<Vec<u8>>> {
    check_format(artifact)?;
    if artifact.nonce.len() != NONCE_LEN {
        return Err(VaultError::IntegrityFailure(format!(
            "nonce is {} bytes, expected {NONCE_LEN}",
            artifact.nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let aad = artifact.aad.as_deref().unwrap_or_default();
    cipher
        .decrypt(
            Nonce::from_slice(&artifact.nonce),
            Payload { msg: &artifact.ciphertext, aad },
        )
        .map(Zeroizing::new)
        .map_err(|_| VaultError::IntegrityFailure("authentication tag mismatch".into()))
}
