//! In-memory keystore.

use super::{Address, KeyNaming, Keystore, KeystoreError, PeerId};
use std::collections::HashMap;

/// Keystore backed by plain maps; useful for tests and for embedding the
/// generator where key material is already loaded.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeystore {
    naming: KeyNaming,
    identities: HashMap<usize, PeerId>,
    addresses: HashMap<usize, Address>,
}

impl MemoryKeystore {
    pub fn new(naming: KeyNaming) -> Self {
        Self {
            naming,
            identities: HashMap::new(),
            addresses: HashMap::new(),
        }
    }

    /// Deterministic key material for ordinals `0..count`
    pub fn sequential(count: usize) -> Self {
        let mut keystore = Self::default();
        for ordinal in 0..count {
            keystore.insert(
                ordinal,
                PeerId(format!("16Uiu2HAmNode{:04}", ordinal)),
                Address(format!("AmNode{:04}Address", ordinal)),
            );
        }
        keystore
    }

    pub fn insert(&mut self, ordinal: usize, identity: PeerId, address: Address) {
        self.identities.insert(ordinal, identity);
        self.addresses.insert(ordinal, address);
    }

    pub fn remove_identity(&mut self, ordinal: usize) -> Option<PeerId> {
        self.identities.remove(&ordinal)
    }

    pub fn remove_address(&mut self, ordinal: usize) -> Option<Address> {
        self.addresses.remove(&ordinal)
    }
}

impl Keystore for MemoryKeystore {
    fn identity(&self, ordinal: usize) -> Result<PeerId, KeystoreError> {
        self.identities
            .get(&ordinal)
            .cloned()
            .ok_or_else(|| KeystoreError::MissingKeyMaterial {
                ordinal,
                reason: "no identity registered".to_string(),
            })
    }

    fn address(&self, ordinal: usize) -> Result<Address, KeystoreError> {
        self.addresses
            .get(&ordinal)
            .cloned()
            .ok_or_else(|| KeystoreError::MissingAddress {
                ordinal,
                reason: "no address registered".to_string(),
            })
    }

    fn key_file_name(&self, ordinal: usize) -> String {
        self.naming.key_file(ordinal)
    }
}
