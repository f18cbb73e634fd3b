//! # Cluster Registry
//!
//! A JSON summary of the provisioned cluster written next to the generated
//! artifacts. Test harnesses read it to find nodes without parsing every
//! node config.
//!
//! ## Example Registry Structure
//!
//! ```json
//! {
//!   "test_run": "testnet01",
//!   "base_port": 7000,
//!   "nodes": [
//!     {
//!       "ordinal": 0,
//!       "role": "producer",
//!       "hidden": true,
//!       "machine": "m0",
//!       "ip_addr": "10.0.0.1",
//!       "rpc_port": 7000,
//!       "p2p_port": 8000,
//!       "prof_port": 9000,
//!       "peer_id": "16Uiu2HAm...",
//!       "multiaddr": "/ip4/10.0.0.1/tcp/8000/p2p/16Uiu2HAm...",
//!       "agent": "16Uiu2HAm..."
//!     }
//!   ]
//! }
//! ```

use crate::config::Role;
use crate::topology::ProvisionedCluster;
use serde::{Deserialize, Serialize};

/// File name of the registry inside the output directory
pub const REGISTRY_FILE: &str = "cluster_registry.json";

/// Registry entry of a single node
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub ordinal: usize,
    pub role: Role,
    pub hidden: bool,
    /// Name of the hosting machine
    pub machine: String,
    pub ip_addr: String,
    pub rpc_port: u16,
    pub p2p_port: u16,
    pub prof_port: u16,
    pub peer_id: String,
    pub multiaddr: String,
    /// Peer id of the fronting agent (producers only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Peer ids of fronted producers (agents only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub producers: Vec<String>,
}

/// Registry of all nodes in the cluster
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClusterRegistry {
    pub test_run: String,
    pub base_port: u16,
    pub nodes: Vec<NodeInfo>,
}

impl ClusterRegistry {
    pub fn from_cluster(test_run: &str, cluster: &ProvisionedCluster) -> Self {
        let nodes = cluster
            .nodes()
            .iter()
            .map(|node| {
                let machine = &cluster.machine_of(node).spec;
                NodeInfo {
                    ordinal: node.ordinal,
                    role: node.role,
                    hidden: node.hidden,
                    machine: machine.name.clone(),
                    ip_addr: machine.ip.to_string(),
                    rpc_port: node.ports.rpc,
                    p2p_port: node.ports.p2p,
                    prof_port: node.ports.prof,
                    peer_id: node.peer_id.to_string(),
                    multiaddr: node.multiaddr.clone(),
                    agent: cluster.delegate_agent(node.ordinal).map(|id| id.to_string()),
                    producers: cluster
                        .delegate_producers(node.ordinal)
                        .into_iter()
                        .map(|id| id.to_string())
                        .collect(),
                }
            })
            .collect();

        Self {
            test_run: test_run.to_string(),
            base_port: cluster.base_port(),
            nodes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
