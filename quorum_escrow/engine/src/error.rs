//! Centralized vault error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// Bytes handed to the payload decoder are not canonical encoder output.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// A wrapped share could not be decoded or failed its role binding.
    #[error("Malformed share: {0}")]
    MalformedShare(String),
    /// The fingerprint already addresses a different artifact.
    #[error("Fingerprint collision on {0}")]
    FingerprintCollision(String),
    /// No entry is registered under the fingerprint.
    #[error("Entry not found: {0}")]
    NotFound(String),
    /// Quorum not met.
    #[error("Insufficient shares: {required} distinct roles required, {provided} provided")]
    InsufficientShares { required: usize, provided: usize },
    /// Authentication failed after combine; covers bad shares and tampered ciphertext alike.
    #[error("Integrity failure: {0}")]
    IntegrityFailure(String),
    /// The artifact was produced by a format this build cannot open.
    #[error("Unsupported algorithm {alg} (format version {version})")]
    UnsupportedAlgorithm { alg: String, version: u16 },
    /// The configured secret-sharing backend is not compiled into this build.
    #[error("Secret sharing backend unavailable: {0}")]
    SecretSharingBackendUnavailable(String),
    /// Threshold, parts or role list violate the sharing policy.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
    /// Combine rejected the share set. Surfaced to callers as `IntegrityFailure`.
    #[error("Share combine failed: {0}")]
    ShareCombineFailed(String),
    /// Backing store failure (lock poisoning, I/O, serialization).
    #[error("Storage error: {0}")]
    Storage(String),
    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
