//! Genesis document layout.

use crate::config::Amount;
use crate::keystore::{Address, PeerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Holder balances and producer set of a cluster's genesis state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    /// Balances in declared holder order; the first entry absorbed the remainder
    pub balances: Vec<(Address, Amount)>,
    /// Producer identities in declaration order
    pub producers: Vec<PeerId>,
}

impl Genesis {
    /// Sum of all balances
    pub fn total(&self) -> u128 {
        self.balances.iter().map(|(_, amount)| amount.0).sum()
    }

    pub fn balance_of(&self, address: &Address) -> Option<Amount> {
        self.balances
            .iter()
            .find(|(holder, _)| holder == address)
            .map(|(_, amount)| *amount)
    }
}

/// Chain identity section of the genesis file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainId {
    pub magic: String,
    pub public: bool,
    pub mainnet: bool,
    pub consensus: String,
}

/// Genesis file as consumed by the nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisDocument {
    pub chain_id: ChainId,
    pub timestamp: i64,
    /// address -> decimal balance string
    pub balance: BTreeMap<String, String>,
    /// Producer peer ids
    pub bps: Vec<String>,
}

impl GenesisDocument {
    pub fn new(magic: &str, timestamp: i64, genesis: &Genesis) -> Self {
        Self {
            chain_id: ChainId {
                magic: magic.to_string(),
                public: false,
                mainnet: false,
                consensus: "dpos".to_string(),
            },
            timestamp,
            balance: genesis
                .balances
                .iter()
                .map(|(address, amount)| (address.to_string(), amount.to_string()))
                .collect(),
            bps: genesis.producers.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
