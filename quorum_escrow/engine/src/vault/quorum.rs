//! Quorum gate run before any share is unwrapped or combined.

use std::collections::BTreeMap;

use crate::error::{Result, VaultError};
use crate::types::Role;
use crate::vault::types::VaultEntry;

pub struct ReconstructionQuorum<'a> {
    entry: &'a VaultEntry,
}

impl<'a> ReconstructionQuorum<'a> {
    pub fn for_entry(entry: &'a VaultEntry) -> Self {
        Self { entry }
    }

    pub fn required(&self) -> usize {
        self.entry.threshold as usize
    }

    /// Keep the submissions from roles registered on the entry and require at
    /// least `threshold` of them. Unregistered roles never count toward quorum.
    pub fn check<'p>(&self, provided: &'p BTreeMap<Role, String>) -> Result<Vec<(&'p Role, &'p str)>> {
        let mut accepted = Vec::with_capacity(provided.len());
        for (role, wrapped) in provided {
            if self.entry.shares.contains_key(role) {
                accepted.push((role, wrapped.as_str()));
            } else {
                tracing::warn!(
                    fingerprint = %self.entry.fingerprint,
                    role = %role,
                    "ignoring share from role not registered on entry"
                );
            }
        }

        if accepted.len() < self.required() {
            return Err(VaultError::InsufficientShares {
                required: self.required(),
                provided: accepted.len(),
            });
        }
        Ok(accepted)
    }
}
