//! # Genesis Composition
//!
//! Computes the holder balances and producer list of the shared genesis
//! state.
//!
//! ## Balance Accounting
//!
//! Every holder except the first in declared order receives exactly
//! `unit_share`. The first holder receives whatever is left:
//!
//! ```text
//! balance(holders[0]) = total_supply - unit_share * (holders.len() - 1)
//! ```
//!
//! so the balances always add up to `total_supply` exactly. Reordering the
//! holder list changes who absorbs the remainder.

pub mod types;

pub use types::{ChainId, Genesis, GenesisDocument};

use crate::config::Amount;
use crate::keystore::{Address, Keystore, KeystoreError};
use crate::topology::ProvisionedCluster;
use log::{debug, info};
use std::collections::HashMap;

/// Errors that abort genesis composition
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("Genesis needs at least one holder")]
    NoHolders,

    #[error("Genesis holder {holder} is not a provisioned node")]
    UnknownHolder { holder: usize },

    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error("Holders {first} and {second} resolve to the same address {address}")]
    DuplicateAddress {
        address: Address,
        first: usize,
        second: usize,
    },

    #[error("unit_share {unit_share} for {others} holder(s) exceeds total_supply {total_supply}")]
    InsufficientSupply {
        total_supply: Amount,
        unit_share: Amount,
        others: usize,
    },
}

/// Compose the genesis balances and producer set.
///
/// All holder addresses are resolved before any balance is computed; a
/// single failed lookup yields no genesis at all.
pub fn compose_genesis<K>(
    cluster: &ProvisionedCluster,
    holders: &[usize],
    total_supply: Amount,
    unit_share: Amount,
    keystore: &K,
) -> Result<Genesis, GenesisError>
where
    K: Keystore + ?Sized,
{
    if holders.is_empty() {
        return Err(GenesisError::NoHolders);
    }

    let mut addresses = Vec::with_capacity(holders.len());
    let mut seen: HashMap<Address, usize> = HashMap::new();
    for &holder in holders {
        if cluster.node(holder).is_none() {
            return Err(GenesisError::UnknownHolder { holder });
        }
        let address = keystore.address(holder)?;
        if let Some(&first) = seen.get(&address) {
            return Err(GenesisError::DuplicateAddress {
                address,
                first,
                second: holder,
            });
        }
        seen.insert(address.clone(), holder);
        addresses.push(address);
    }

    let others = holders.len() - 1;
    let remainder = unit_share
        .0
        .checked_mul(others as u128)
        .and_then(|distributed| total_supply.0.checked_sub(distributed))
        .ok_or(GenesisError::InsufficientSupply {
            total_supply,
            unit_share,
            others,
        })?;

    let balances: Vec<(Address, Amount)> = addresses
        .into_iter()
        .enumerate()
        .map(|(position, address)| {
            let amount = if position == 0 { remainder } else { unit_share.0 };
            (address, Amount(amount))
        })
        .collect();
    debug!("Genesis remainder holder {} receives {}", holders[0], remainder);

    let producers = cluster.producer_ids().into_iter().cloned().collect::<Vec<_>>();

    info!(
        "Composed genesis: {} holder(s), {} producer(s), total supply {}",
        balances.len(),
        producers.len(),
        total_supply
    );
    Ok(Genesis { balances, producers })
}

/// File name of the genesis document for a test run
pub fn genesis_file_name(test_run: &str) -> String {
    format!("genesis_{}.json", test_run)
}
