use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, RwLock};

use crate::error::{Result, VaultError};
use crate::types::Fingerprint;
use crate::vault::backend::{EntryStore, PutOutcome};
use crate::vault::types::VaultEntry;

/// In-process store. Reads share the lock; inserts serialize on the write lock.
#[derive(Default)]
pub struct MemoryEntryStore {
    entries: Arc<RwLock<HashMap<Fingerprint, Arc<VaultEntry>>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryStore for MemoryEntryStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Arc<VaultEntry>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| VaultError::Storage("Vault lock poisoned".into()))?;
        Ok(entries.get(fingerprint).cloned())
    }

    fn put_if_absent(&self, entry: VaultEntry) -> Result<PutOutcome> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| VaultError::Storage("Vault lock poisoned".into()))?;

        match entries.entry(entry.fingerprint.clone()) {
            Entry::Occupied(existing) if existing.get().artifact == entry.artifact => {
                Ok(PutOutcome::AlreadyPresent)
            }
            Entry::Occupied(existing) => {
                Err(VaultError::FingerprintCollision(existing.key().to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(entry));
                Ok(PutOutcome::Inserted)
            }
        }
    }

    fn list(&self) -> Result<Vec<Fingerprint>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| VaultError::Storage("Vault lock poisoned".into()))?;
        let mut fingerprints: Vec<Fingerprint> = entries.keys().cloned().collect();
        fingerprints.sort();
        Ok(fingerprints)
    }
}
