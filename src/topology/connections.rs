//! Peer visibility graph.
//!
//! A node bootstraps against every other node on its own machine, which is
//! how hidden producers reach the network through a colocated agent. Public
//! nodes additionally form a full mesh with every other public node across
//! all machines.

use super::types::ProvisionedCluster;
use std::collections::{BTreeMap, BTreeSet};

impl ProvisionedCluster {
    /// Ordinals the node at `ordinal` should bootstrap against.
    ///
    /// The set never contains `ordinal` itself and iterates in ascending
    /// ordinal order. Unknown ordinals have no peers.
    pub fn visible_peers(&self, ordinal: usize) -> BTreeSet<usize> {
        let Some(node) = self.node(ordinal) else {
            return BTreeSet::new();
        };

        let mut peers: BTreeSet<usize> = self.machine_of(node).nodes.iter().copied().collect();
        if node.is_public() {
            peers.extend(self.public.iter().copied());
        }
        peers.remove(&ordinal);
        peers
    }
}

/// Visible peers of every node, keyed by ordinal
pub fn peer_graph(cluster: &ProvisionedCluster) -> BTreeMap<usize, BTreeSet<usize>> {
    cluster
        .nodes()
        .iter()
        .map(|node| (node.ordinal, cluster.visible_peers(node.ordinal)))
        .collect()
}
