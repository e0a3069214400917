pub mod directory;
pub mod memory;

use std::sync::Arc;

use crate::error::Result;
use crate::types::Fingerprint;
use crate::vault::types::VaultEntry;

pub use directory::DirectoryEntryStore;
pub use memory::MemoryEntryStore;

/// Result of a `put_if_absent` that did not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    /// The same artifact was already registered under this fingerprint.
    AlreadyPresent,
}

/// Pluggable fingerprint → entry registry. Lifecycle belongs to the host.
///
/// `put_if_absent` must check and insert atomically: a fingerprint already
/// bound to a different artifact is a `FingerprintCollision`, never an overwrite.
pub trait EntryStore: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Arc<VaultEntry>>>;
    fn put_if_absent(&self, entry: VaultEntry) -> Result<PutOutcome>;
    /// All fingerprints, sorted.
    fn list(&self) -> Result<Vec<Fingerprint>>;
}
