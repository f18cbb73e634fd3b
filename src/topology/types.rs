//! Topology type definitions.
//!
//! This file contains the records produced by provisioning: per-node network
//! identity, per-machine membership, role partitions and the agent/producer
//! delegation table.

use crate::keystore::PeerId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Re-export declaration types from config to keep topology self-contained
pub use crate::config::{MachineSpec, NodeSpec, RemoteHost, Role};

/// Distance between the rpc, p2p and profiling port tiers
pub const PORT_TIER_SPAN: u16 = 1000;

/// Node count at which rpc ports would run into the p2p tier
pub const MAX_NODES: usize = PORT_TIER_SPAN as usize;

/// Ports of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodePorts {
    pub rpc: u16,
    pub p2p: u16,
    pub prof: u16,
}

impl NodePorts {
    /// Ports for the node at `ordinal`, or `None` if they leave the u16 range
    pub fn for_ordinal(base_port: u16, ordinal: usize) -> Option<Self> {
        let ordinal = u16::try_from(ordinal).ok()?;
        let rpc = base_port.checked_add(ordinal)?;
        let p2p = rpc.checked_add(PORT_TIER_SPAN)?;
        let prof = p2p.checked_add(PORT_TIER_SPAN)?;
        Some(Self { rpc, p2p, prof })
    }
}

/// A machine together with the ordinals of the nodes it hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedMachine {
    pub spec: MachineSpec,
    /// Hosted node ordinals in declaration order
    pub nodes: Vec<usize>,
}

/// A node with its derived network identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedNode {
    pub ordinal: usize,
    /// Index into [`ProvisionedCluster::machines`]
    pub machine: usize,
    pub role: Role,
    pub hidden: bool,
    pub clients: Vec<usize>,
    pub ports: NodePorts,
    pub peer_id: PeerId,
    pub multiaddr: String,
    pub key_file: String,
    /// Node home directory on its machine
    pub home: PathBuf,
}

impl ProvisionedNode {
    pub fn is_producer(&self) -> bool {
        self.role == Role::Producer
    }

    /// Publicly visible nodes form the cross-machine bootstrap mesh
    pub fn is_public(&self) -> bool {
        !self.hidden
    }
}

/// Agent/producer association built in the second provisioning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delegations {
    /// producer ordinal -> fronting agent ordinal
    pub(crate) agent_of: BTreeMap<usize, usize>,
    /// agent ordinal -> fronted producer ordinals, in declared client order
    pub(crate) producers_of: BTreeMap<usize, Vec<usize>>,
}

impl Delegations {
    pub fn agent_of(&self, producer: usize) -> Option<usize> {
        self.agent_of.get(&producer).copied()
    }

    pub fn producers_of(&self, agent: usize) -> &[usize] {
        self.producers_of
            .get(&agent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Result of provisioning; read-only once returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedCluster {
    pub(crate) base_port: u16,
    pub(crate) machines: Vec<ProvisionedMachine>,
    pub(crate) nodes: Vec<ProvisionedNode>,
    pub(crate) producers: Vec<usize>,
    pub(crate) agents: Vec<usize>,
    pub(crate) public: Vec<usize>,
    pub(crate) delegations: Delegations,
}

impl ProvisionedCluster {
    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    pub fn machines(&self) -> &[ProvisionedMachine] {
        &self.machines
    }

    pub fn nodes(&self) -> &[ProvisionedNode] {
        &self.nodes
    }

    pub fn node(&self, ordinal: usize) -> Option<&ProvisionedNode> {
        self.nodes.get(ordinal)
    }

    /// Machine hosting a node
    pub fn machine_of(&self, node: &ProvisionedNode) -> &ProvisionedMachine {
        &self.machines[node.machine]
    }

    /// Producer ordinals in declaration order
    pub fn producers(&self) -> &[usize] {
        &self.producers
    }

    pub fn agents(&self) -> &[usize] {
        &self.agents
    }

    /// Ordinals of all non-hidden nodes
    pub fn public(&self) -> &[usize] {
        &self.public
    }

    pub fn delegations(&self) -> &Delegations {
        &self.delegations
    }

    /// Identity of the agent fronting a producer, if any
    pub fn delegate_agent(&self, ordinal: usize) -> Option<&PeerId> {
        self.delegations
            .agent_of(ordinal)
            .and_then(|agent| self.node(agent))
            .map(|agent| &agent.peer_id)
    }

    /// Identities of the producers fronted by an agent
    pub fn delegate_producers(&self, ordinal: usize) -> Vec<&PeerId> {
        self.delegations
            .producers_of(ordinal)
            .iter()
            .filter_map(|&producer| self.node(producer))
            .map(|producer| &producer.peer_id)
            .collect()
    }

    /// Peer identities of all producers in declaration order
    pub fn producer_ids(&self) -> Vec<&PeerId> {
        self.producers
            .iter()
            .filter_map(|&ordinal| self.node(ordinal))
            .map(|node| &node.peer_id)
            .collect()
    }
}
