//! Shared identifiers for the escrow vault: roles, fingerprints and content hashes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// A role-holder label that receives one share (e.g. `user`, `operator`, `regulator`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    pub const USER: &'static str = "user";
    pub const OPERATOR: &'static str = "operator";
    pub const REGULATOR: &'static str = "regulator";

    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.is_empty() {
            return Err(VaultError::InvalidPolicy("role label must not be empty".into()));
        }
        if label.contains('=') || label.chars().any(char::is_whitespace) {
            return Err(VaultError::InvalidPolicy(format!(
                "role label {label:?} must not contain '=' or whitespace"
            )));
        }
        Ok(Role(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed ordered role list used when nothing else is configured.
    pub fn default_roles() -> Vec<Role> {
        [Self::USER, Self::OPERATOR, Self::REGULATOR]
            .into_iter()
            .map(|r| Role(r.to_string()))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Role {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Role::new(s)
    }
}

impl TryFrom<String> for Role {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Role::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Lookup key of a vault entry, derived from the artifact ciphertext.
///
/// Stored as lowercase hex. Its width is set by `VaultConfig::fingerprint_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_digest(digest: &[u8]) -> Self {
        Fingerprint(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = VaultError;

    /// Accepts caller input; anything that is not lowercase hex can never match an entry.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VaultError::NotFound(s.to_string()));
        }
        Ok(Fingerprint(normalized))
    }
}

/// Hex SHA-256 of an encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
