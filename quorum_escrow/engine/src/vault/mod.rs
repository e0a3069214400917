//! Threshold escrow vault.
//!
//! `create` encodes and encrypts a payload under a fresh data key, splits the
//! key into one share per role and registers the entry under its fingerprint.
//! `reconstruct` checks the quorum, unwraps and combines the submitted shares
//! and opens the artifact.
//!
//! Combine failures and decrypt failures are distinct internally but both
//! surface as `IntegrityFailure`: a corrupted share combines "successfully"
//! into a wrong key, so the tag check is the only place it can be caught.

pub mod backend;
pub mod quorum;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::binder::binder_for;
use crate::codec;
use crate::config::VaultConfig;
use crate::crypto::{DataKey, envelope, hashing};
use crate::error::{Result, VaultError};
use crate::sharing::{KeyShare, SplitterBackend, ThresholdSplitter, check_policy, splitter_for};
use crate::types::{Fingerprint, Role};

use backend::{EntryStore, MemoryEntryStore, PutOutcome};
use quorum::ReconstructionQuorum;
pub use types::{CreateReceipt, EntrySummary, Reconstruction, ShareRecord, VaultEntry};

pub struct Vault {
    store: Arc<dyn EntryStore>,
    splitter: Arc<dyn ThresholdSplitter>,
    config: VaultConfig,
}

impl Vault {
    /// Build a vault over `store`. Fails fast if the configured splitter backend
    /// is not compiled in.
    pub fn new(config: VaultConfig, store: Arc<dyn EntryStore>) -> Result<Self> {
        config.validate()?;
        let splitter = splitter_for(config.splitter)?;
        Self::with_splitter(config, store, splitter)
    }

    /// Build a vault with an explicit splitter implementation.
    pub fn with_splitter(
        config: VaultConfig,
        store: Arc<dyn EntryStore>,
        splitter: Arc<dyn ThresholdSplitter>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            splitter = splitter.name(),
            binding = %config.binding,
            roles = config.roles.len(),
            "vault initialized"
        );
        Ok(Self { store, splitter, config })
    }

    /// Default configuration over a fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::new(VaultConfig::default(), Arc::new(MemoryEntryStore::new()))
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Protect `payload` with the configured default policy (2 of 3 unless changed).
    pub fn create_default(&self, payload: &Value) -> Result<CreateReceipt> {
        self.create(payload, self.config.default_threshold, self.config.default_parts)
    }

    /// Protect `payload` so that any `threshold` of the first `parts` roles can recover it.
    pub fn create(&self, payload: &Value, threshold: u8, parts: u8) -> Result<CreateReceipt> {
        check_policy(threshold, parts)?;
        if parts as usize > self.config.roles.len() {
            return Err(VaultError::InvalidPolicy(format!(
                "{parts} parts requested but only {} roles are configured",
                self.config.roles.len()
            )));
        }

        let encoded = Zeroizing::new(codec::encode(payload)?);
        let content_hash = codec::content_hash(&encoded);

        let key = DataKey::generate();
        let artifact = envelope::encrypt(&encoded, &key, None)?;
        let fingerprint = hashing::fingerprint(&artifact.ciphertext, self.config.fingerprint_bytes);

        let key_shares = self.splitter.split(key.as_bytes(), threshold, parts)?;
        let binder = binder_for(
            self.config.binding,
            self.config.binding_secret.as_ref().map(|s| s.as_bytes()),
            &fingerprint,
        )?;

        let roles = &self.config.roles[..parts as usize];
        let mut records = BTreeMap::new();
        for (role, share) in roles.iter().zip(&key_shares) {
            records.insert(
                role.clone(),
                ShareRecord { role: role.clone(), wrapped_share: binder.wrap(share, role) },
            );
        }

        let entry = VaultEntry {
            fingerprint: fingerprint.clone(),
            artifact,
            content_hash: content_hash.clone(),
            threshold,
            parts,
            binding: self.config.binding,
            splitter: self.splitter.name().to_string(),
            created_at: Utc::now(),
            shares: records,
        };

        let shares = match self.store.put_if_absent(entry.clone()) {
            Ok(PutOutcome::Inserted) => handout(&entry),
            Ok(PutOutcome::AlreadyPresent) => {
                // Same artifact already registered; its shares are the valid ones.
                debug!(%fingerprint, "entry already present");
                let existing = self.lookup_fingerprint(&fingerprint)?;
                handout(&existing)
            }
            Err(e) => {
                if matches!(e, VaultError::FingerprintCollision(_)) {
                    error!(%fingerprint, "fingerprint collision with a different artifact");
                }
                return Err(e);
            }
        };

        info!(%fingerprint, threshold, parts, "escrow entry created");
        Ok(CreateReceipt { fingerprint, content_hash, shares })
    }

    /// Fetch an entry by fingerprint string.
    pub fn lookup(&self, fingerprint: &str) -> Result<Arc<VaultEntry>> {
        let fingerprint: Fingerprint = fingerprint.parse()?;
        self.lookup_fingerprint(&fingerprint)
    }

    fn lookup_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Arc<VaultEntry>> {
        self.store
            .get(fingerprint)?
            .ok_or_else(|| VaultError::NotFound(fingerprint.to_string()))
    }

    /// Recover a payload from a quorum of role shares.
    pub fn reconstruct(
        &self,
        fingerprint: &str,
        provided: &BTreeMap<Role, String>,
    ) -> Result<Reconstruction> {
        let entry = match self.lookup(fingerprint) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(fingerprint, "reconstruct for unknown entry");
                return Err(e);
            }
        };

        let accepted = ReconstructionQuorum::for_entry(&entry).check(provided).inspect_err(|e| {
            warn!(fingerprint = %entry.fingerprint, error = %e, "quorum not met");
        })?;

        envelope::check_format(&entry.artifact)?;
        let splitter = self.splitter_for_entry(&entry)?;
        let binder = binder_for(
            entry.binding,
            self.config.binding_secret.as_ref().map(|s| s.as_bytes()),
            &entry.fingerprint,
        )?;

        let key_shares = accepted
            .iter()
            .map(|(role, wrapped)| binder.unwrap(wrapped, role))
            .collect::<Result<Vec<KeyShare>>>()
            .inspect_err(|e| warn!(fingerprint = %entry.fingerprint, error = %e, "share unwrap failed"))?;

        let key = self.recover_key(&entry, splitter.as_ref(), &key_shares)?;

        let plaintext = envelope::decrypt(&entry.artifact, &key).inspect_err(|e| {
            error!(fingerprint = %entry.fingerprint, error = %e, "artifact failed authentication");
        })?;

        let payload = codec::decode(&plaintext)?;
        let content_hash = codec::content_hash(&plaintext);
        let hash_matches = content_hash == entry.content_hash;
        if !hash_matches {
            error!(fingerprint = %entry.fingerprint, "content hash differs from the one recorded at creation");
        }

        info!(fingerprint = %entry.fingerprint, roles = accepted.len(), "escrow entry reconstructed");
        Ok(Reconstruction { payload, content_hash, hash_matches })
    }

    fn recover_key(
        &self,
        entry: &VaultEntry,
        splitter: &dyn ThresholdSplitter,
        shares: &[KeyShare],
    ) -> Result<DataKey> {
        let secret = splitter.combine(shares, entry.threshold).map_err(|e| match e {
            VaultError::ShareCombineFailed(reason) => {
                error!(fingerprint = %entry.fingerprint, %reason, "share combine rejected");
                VaultError::IntegrityFailure(format!("shares do not combine: {reason}"))
            }
            other => other,
        })?;
        DataKey::from_slice(&secret)
    }

    fn splitter_for_entry(&self, entry: &VaultEntry) -> Result<Arc<dyn ThresholdSplitter>> {
        if entry.splitter == self.splitter.name() {
            return Ok(Arc::clone(&self.splitter));
        }
        let backend: SplitterBackend = entry.splitter.parse().map_err(|_| {
            VaultError::SecretSharingBackendUnavailable(format!(
                "entry was split with unknown backend {:?}",
                entry.splitter
            ))
        })?;
        splitter_for(backend)
    }

    /// Metadata for every entry, in fingerprint order.
    pub fn list(&self) -> Result<Vec<EntrySummary>> {
        self.store
            .list()?
            .iter()
            .filter_map(|fp| self.store.get(fp).transpose())
            .map(|entry| entry.map(|e| e.summary()))
            .collect()
    }

    /// Serialize an entry to its persisted JSON layout.
    pub fn export(&self, fingerprint: &str) -> Result<String> {
        let entry = self.lookup(fingerprint)?;
        serde_json::to_string_pretty(entry.as_ref())
            .map_err(|e| VaultError::Storage(format!("Serialization failed: {e}")))
    }

    /// Register an entry from its persisted JSON layout after checking it is
    /// self-consistent.
    pub fn import(&self, document: &str) -> Result<Fingerprint> {
        let entry: VaultEntry = serde_json::from_str(document)
            .map_err(|e| VaultError::Storage(format!("invalid entry document: {e}")))?;

        envelope::check_format(&entry.artifact)?;
        check_policy(entry.threshold, entry.parts)?;

        let width = entry.fingerprint.as_str().len() / 2;
        hashing::check_width(width)?;
        let expected = hashing::fingerprint(&entry.artifact.ciphertext, width);
        if expected != entry.fingerprint {
            return Err(VaultError::IntegrityFailure(format!(
                "fingerprint {} does not match ciphertext",
                entry.fingerprint
            )));
        }
        if entry.shares.len() != entry.parts as usize
            || entry.shares.iter().any(|(role, record)| *role != record.role)
        {
            return Err(VaultError::InvalidPolicy(format!(
                "entry {} lists {} shares for {} parts",
                entry.fingerprint,
                entry.shares.len(),
                entry.parts
            )));
        }

        let fingerprint = entry.fingerprint.clone();
        match self.store.put_if_absent(entry)? {
            PutOutcome::Inserted => info!(%fingerprint, "escrow entry imported"),
            PutOutcome::AlreadyPresent => debug!(%fingerprint, "imported entry already present"),
        }
        Ok(fingerprint)
    }
}

fn handout(entry: &VaultEntry) -> BTreeMap<Role, String> {
    entry
        .shares
        .iter()
        .map(|(role, record)| (role.clone(), record.wrapped_share.clone()))
        .collect()
}
