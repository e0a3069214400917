//! Vault configuration, loaded from the environment or deserialized by the host.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::binder::BindingMode;
use crate::crypto::hashing::{DEFAULT_FINGERPRINT_BYTES, check_width};
use crate::error::{Result, VaultError};
use crate::sharing::{SplitterBackend, check_policy};
use crate::types::Role;

/// 256-bit secret keying the authenticated share binding.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct BindingSecret(Zeroizing<[u8; 32]>);

impl BindingSecret {
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut secret[..]);
        BindingSecret(secret)
    }

    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| VaultError::Config(format!("binding secret is not hex: {e}")))?,
        );
        if bytes.len() != 32 {
            return Err(VaultError::Config(
                "binding secret must be 32 bytes (64 hex chars)".into(),
            ));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&bytes);
        Ok(BindingSecret(secret))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<String> for BindingSecret {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        BindingSecret::from_hex(&value)
    }
}

// Custom Debug implementation to prevent secret leakage
impl fmt::Debug for BindingSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BindingSecret([REDACTED])")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Ordered role list; the first `parts` roles receive shares.
    pub roles: Vec<Role>,
    pub default_threshold: u8,
    pub default_parts: u8,
    /// Bytes of BLAKE3 digest kept in each fingerprint.
    pub fingerprint_bytes: usize,
    pub splitter: SplitterBackend,
    pub binding: BindingMode,
    pub binding_secret: Option<BindingSecret>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            roles: Role::default_roles(),
            default_threshold: 2,
            default_parts: 3,
            fingerprint_bytes: DEFAULT_FINGERPRINT_BYTES,
            splitter: SplitterBackend::Gf256,
            binding: BindingMode::Transport,
            binding_secret: None,
        }
    }
}

impl VaultConfig {
    /// Load configuration from `QUORUM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = VaultConfig::default();

        if let Some(roles) = lookup("QUORUM_ROLES") {
            config.roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(Role::new)
                .collect::<Result<_>>()?;
        }
        if let Some(threshold) = lookup("QUORUM_THRESHOLD") {
            config.default_threshold = parse_num("QUORUM_THRESHOLD", &threshold)?;
        }
        if let Some(parts) = lookup("QUORUM_PARTS") {
            config.default_parts = parse_num("QUORUM_PARTS", &parts)?;
        }
        if let Some(width) = lookup("QUORUM_FINGERPRINT_BYTES") {
            config.fingerprint_bytes = parse_num("QUORUM_FINGERPRINT_BYTES", &width)?;
        }
        if let Some(backend) = lookup("QUORUM_SPLITTER") {
            config.splitter = backend.parse()?;
        }
        if let Some(mode) = lookup("QUORUM_BINDING") {
            config.binding = mode.parse()?;
        }
        if let Some(secret) = lookup("QUORUM_BINDING_SECRET") {
            config.binding_secret = Some(BindingSecret::from_hex(&secret)?);
        }

        if config.binding == BindingMode::Authenticated && config.binding_secret.is_none() {
            tracing::warn!(
                "QUORUM_BINDING_SECRET not set; generated an ephemeral binding secret, \
                 shares issued now will not unwrap after restart"
            );
            config.binding_secret = Some(BindingSecret::generate());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_width(self.fingerprint_bytes)?;

        if self.roles.is_empty() {
            return Err(VaultError::Config("at least one role is required".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for role in &self.roles {
            if !seen.insert(role) {
                return Err(VaultError::Config(format!("duplicate role {role}")));
            }
        }
        if self.roles.len() > u8::MAX as usize {
            return Err(VaultError::Config("at most 255 roles are supported".into()));
        }

        check_policy(self.default_threshold, self.default_parts)
            .map_err(|e| VaultError::Config(e.to_string()))?;
        if self.default_parts as usize > self.roles.len() {
            return Err(VaultError::Config(format!(
                "default parts {} exceeds the {} configured roles",
                self.default_parts,
                self.roles.len()
            )));
        }

        if self.binding == BindingMode::Authenticated && self.binding_secret.is_none() {
            return Err(VaultError::Config(
                "authenticated binding requires a binding secret".into(),
            ));
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| VaultError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_two_of_three() {
        let config = VaultConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.default_threshold, 2);
        assert_eq!(config.default_parts, 3);
        assert_eq!(config.roles, Role::default_roles());
        assert_eq!(config.binding, BindingMode::Transport);
        assert!(config.binding_secret.is_none());
    }

    #[test]
    fn environment_overrides() {
        let secret = "ab".repeat(32);
        let config = VaultConfig::from_lookup(lookup_from(&[
            ("QUORUM_ROLES", "user, operator, regulator, auditor"),
            ("QUORUM_THRESHOLD", "3"),
            ("QUORUM_PARTS", "4"),
            ("QUORUM_FINGERPRINT_BYTES", "32"),
            ("QUORUM_BINDING", "authenticated"),
            ("QUORUM_BINDING_SECRET", secret.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.roles.len(), 4);
        assert_eq!(config.default_threshold, 3);
        assert_eq!(config.fingerprint_bytes, 32);
        assert_eq!(config.binding_secret.unwrap().as_bytes(), &[0xAB; 32]);
    }

    #[test]
    fn authenticated_mode_without_secret_gets_an_ephemeral_one() {
        let config =
            VaultConfig::from_lookup(lookup_from(&[("QUORUM_BINDING", "authenticated")])).unwrap();
        assert!(config.binding_secret.is_some());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for pairs in [
            vec![("QUORUM_THRESHOLD", "1")],
            vec![("QUORUM_THRESHOLD", "4")],
            vec![("QUORUM_PARTS", "many")],
            vec![("QUORUM_ROLES", "user,user,operator")],
            vec![("QUORUM_FINGERPRINT_BYTES", "4")],
            vec![("QUORUM_BINDING_SECRET", "abcd")],
            vec![("QUORUM_SPLITTER", "vss")],
            vec![("QUORUM_ROLES", "user,operator"), ("QUORUM_PARTS", "3")],
        ] {
            assert!(VaultConfig::from_lookup(lookup_from(&pairs)).is_err(), "{pairs:?}");
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let config = VaultConfig {
            binding: BindingMode::Authenticated,
            binding_secret: Some(BindingSecret::from_hex(&"11".repeat(32)).unwrap()),
            ..VaultConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("1111"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"default_threshold": 3, "binding": "transport"}"#).unwrap();
        assert_eq!(config.default_threshold, 3);
        assert_eq!(config.default_parts, 3);
        assert!(config.validate().is_ok());
    }
}
