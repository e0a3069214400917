//! One JSON document per entry, named `<fingerprint>.json`.
//!
//! Entries are written to a private temp file and published with a hard
//! link, which fails if the target exists. Two processes racing on the same
//! fingerprint therefore cannot clobber each other, and readers never see a
//! half-written file. Durability (fsync, replication) is left to the host.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Result, VaultError};
use crate::types::Fingerprint;
use crate::vault::backend::{EntryStore, PutOutcome};
use crate::vault::types::VaultEntry;

const EXTENSION: &str = "json";

pub struct DirectoryEntryStore {
    root: PathBuf,
}

impl DirectoryEntryStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| VaultError::Storage(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        // Fingerprints are hex-only, so they are always a single safe path component.
        self.root.join(format!("{}.{EXTENSION}", fingerprint.as_str()))
    }

    fn read_entry(path: &Path) -> Result<Option<VaultEntry>> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                VaultError::Storage(format!("corrupt entry {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Storage(format!("cannot read {}: {e}", path.display()))),
        }
    }

    fn write_temp(&self, bytes: &[u8]) -> Result<PathBuf> {
        let mut suffix = [0u8; 8];
        OsRng.fill_bytes(&mut suffix);
        let tmp = self.root.join(format!(".tmp-{}", hex::encode(suffix)));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .map_err(|e| VaultError::Storage(format!("cannot create {}: {e}", tmp.display())))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| VaultError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        Ok(tmp)
    }
}

impl EntryStore for DirectoryEntryStore {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Arc<VaultEntry>>> {
        Ok(Self::read_entry(&self.path_for(fingerprint))?.map(Arc::new))
    }

    fn put_if_absent(&self, entry: VaultEntry) -> Result<PutOutcome> {
        let target = self.path_for(&entry.fingerprint);
        let bytes = serde_json::to_vec_pretty(&entry)
            .map_err(|e| VaultError::Storage(format!("Serialization failed: {e}")))?;

        let tmp = self.write_temp(&bytes)?;
        let linked = fs::hard_link(&tmp, &target);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => Ok(PutOutcome::Inserted),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match Self::read_entry(&target)? {
                Some(existing) if existing.artifact == entry.artifact => Ok(PutOutcome::AlreadyPresent),
                _ => Err(VaultError::FingerprintCollision(entry.fingerprint.to_string())),
            },
            Err(e) => Err(VaultError::Storage(format!("cannot publish {}: {e}", target.display()))),
        }
    }

    fn list(&self) -> Result<Vec<Fingerprint>> {
        let dir = fs::read_dir(&self.root)
            .map_err(|e| VaultError::Storage(format!("cannot list {}: {e}", self.root.display())))?;

        let mut fingerprints = Vec::new();
        for item in dir {
            let path = item.map_err(|e| VaultError::Storage(e.to_string()))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(fingerprint) = stem.parse::<Fingerprint>() {
                    fingerprints.push(fingerprint);
                }
            }
        }
        fingerprints.sort();
        Ok(fingerprints)
    }
}
