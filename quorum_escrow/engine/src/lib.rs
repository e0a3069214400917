//! Quorum escrow engine: threshold-protected payload vault.
//!
//! A payload is canonically encoded, sealed with a single-use AES-256-GCM key,
//! and the key is Shamir-split into one share per role. Any quorum of roles can
//! reconstruct the payload; fewer learn nothing about the key.

pub mod binder;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod sharing;
pub mod types;
pub mod vault;

pub use binder::BindingMode;
pub use config::{BindingSecret, VaultConfig};
pub use error::{Result, VaultError};
pub use sharing::{SplitterBackend, ThresholdSplitter};
pub use types::{ContentHash, Fingerprint, Role};
pub use vault::backend::{DirectoryEntryStore, EntryStore, MemoryEntryStore, PutOutcome};
pub use vault::{CreateReceipt, EntrySummary, Reconstruction, ShareRecord, Vault, VaultEntry};
