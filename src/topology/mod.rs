//! Cluster topology module.
//!
//! This module turns the declared machines and nodes into a provisioned
//! cluster and computes which peers each node bootstraps against.

pub mod types;
pub mod provision;
pub mod connections;

// Re-export key types and functions for easier access
pub use types::{
    Delegations, NodePorts, ProvisionedCluster, ProvisionedMachine, ProvisionedNode,
    MAX_NODES, PORT_TIER_SPAN,
};
pub use provision::{provision, ProvisionError};
pub use connections::peer_graph;
