//! Node key material lookup.
//!
//! Every node ordinal maps to a peer identity (used in multiaddresses and
//! delegation lists) and a ledger address (used for genesis balances). The
//! provisioner and genesis composer only see the [`Keystore`] trait, so the
//! on-disk layout produced by the key generation tool stays an external
//! detail.
//!
//! ## Naming
//!
//! Key files follow the layout written by `aergocli keygen --addr <stem>`:
//!
//! ```text
//! keys/
//! |-- node00.key    # private key, referenced from the node config
//! |-- node00.id     # peer identity
//! \-- node00.addr   # ledger address
//! ```

pub mod directory;
pub mod memory;

pub use directory::DirKeystore;
pub use memory::MemoryKeystore;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque peer identity of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger account address of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File naming scheme shared by all key material of one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNaming {
    prefix: String,
}

impl KeyNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// File stem for an ordinal, e.g. `node03`
    pub fn stem(&self, ordinal: usize) -> String {
        format!("{}{:02}", self.prefix, ordinal)
    }

    pub fn key_file(&self, ordinal: usize) -> String {
        format!("{}.key", self.stem(ordinal))
    }

    pub fn id_file(&self, ordinal: usize) -> String {
        format!("{}.id", self.stem(ordinal))
    }

    pub fn addr_file(&self, ordinal: usize) -> String {
        format!("{}.addr", self.stem(ordinal))
    }
}

impl Default for KeyNaming {
    fn default() -> Self {
        Self::new("node")
    }
}

/// Errors raised while looking up or generating key material
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("Missing key material for node {ordinal}: {reason}")]
    MissingKeyMaterial { ordinal: usize, reason: String },

    #[error("Missing address for node {ordinal}: {reason}")]
    MissingAddress { ordinal: usize, reason: String },

    #[error("Key generation failed for node {ordinal}: {reason}")]
    Keygen { ordinal: usize, reason: String },
}

/// Capability to resolve node ordinals to key material.
///
/// Implementations must be safe to query from several threads, since the
/// provisioner resolves identities in parallel.
pub trait Keystore: Sync {
    /// Peer identity of the node at `ordinal`
    fn identity(&self, ordinal: usize) -> Result<PeerId, KeystoreError>;

    /// Ledger address of the node at `ordinal`
    fn address(&self, ordinal: usize) -> Result<Address, KeystoreError>;

    /// Private key file name the node config should reference
    fn key_file_name(&self, ordinal: usize) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_naming() {
        let naming = KeyNaming::new("bp");
        assert_eq!(naming.stem(3), "bp03");
        assert_eq!(naming.key_file(3), "bp03.key");
        assert_eq!(naming.id_file(12), "bp12.id");
        assert_eq!(naming.addr_file(120), "bp120.addr");
        assert_eq!(KeyNaming::default().stem(0), "node00");
    }
}
