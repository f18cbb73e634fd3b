//! # Node Config Rendering
//!
//! Turns a provisioned node and its visible peers into a [`ConfigRecord`],
//! then lays the record out as the node's TOML config file. Rendering is a
//! pure function of the provisioned cluster: the same cluster always yields
//! byte-identical files.
//!
//! ## Derived Flags
//!
//! | field        | value                     |
//! |--------------|---------------------------|
//! | `enablebp`   | role is producer          |
//! | `expose`     | node is not hidden        |
//! | `discover`   | node is not hidden        |
//! | `usepolaris` | node is not hidden        |
//!
//! Hidden nodes get no bootstrap peers and no polaris list; they only find
//! the network through the nodes sharing their machine.

pub mod types;

pub use types::{ConfigRecord, NodeConfigDocument};

use crate::topology::{peer_graph, ProvisionedCluster, ProvisionedNode};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Build the config record of one node
pub fn render_node(
    cluster: &ProvisionedCluster,
    node: &ProvisionedNode,
    visible_peers: &BTreeSet<usize>,
    polarises: &[String],
) -> ConfigRecord {
    let machine = &cluster.machine_of(node).spec;
    let public = node.is_public();

    let peers = if public {
        visible_peers
            .iter()
            .filter_map(|&ordinal| cluster.node(ordinal))
            .map(|peer| peer.multiaddr.clone())
            .collect()
    } else {
        Vec::new()
    };

    ConfigRecord {
        home: node.home.to_string_lossy().to_string(),
        hostaddr: machine.ip.to_string(),
        rpc: node.ports.rpc,
        p2pport: node.ports.p2p,
        profport: node.ports.prof,
        pkfilename: node.key_file.clone(),
        enablebp: node.is_producer(),
        expose: public,
        discover: public,
        usepolaris: public,
        polarises: if public { polarises.to_vec() } else { Vec::new() },
        role: node.role.as_str().to_string(),
        agent: cluster
            .delegate_agent(node.ordinal)
            .map(|id| id.to_string())
            .unwrap_or_default(),
        producers: cluster
            .delegate_producers(node.ordinal)
            .into_iter()
            .map(|id| id.to_string())
            .collect(),
        peers,
    }
}

/// Config records of every node, in ordinal order
pub fn render_all(cluster: &ProvisionedCluster, polarises: &[String]) -> Vec<ConfigRecord> {
    let graph = peer_graph(cluster);
    cluster
        .nodes()
        .par_iter()
        .map(|node| render_node(cluster, node, &graph[&node.ordinal], polarises))
        .collect()
}

/// File name of a node config, keyed by its rpc port
pub fn config_file_name(record: &ConfigRecord) -> String {
    format!("{}.toml", record.rpc)
}

/// Serialize a record into the node's TOML config file
pub fn to_toml(record: &ConfigRecord) -> Result<String, toml::ser::Error> {
    let document = NodeConfigDocument::from(record);
    let body = toml::to_string(&document)?;
    Ok(format!(
        "# aergo TOML Configuration File (https://github.com/toml-lang/toml)\n# role: {}, rpc port: {}\n\n{}",
        record.role, record.rpc, body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MachineSpec, NodeSpec, Role};
    use crate::keystore::MemoryKeystore;
    use crate::topology::provision;
    use std::path::PathBuf;

    fn agent_cluster() -> ProvisionedCluster {
        let machines = vec![
            MachineSpec {
                name: "m0".to_string(),
                os: "linux".to_string(),
                ip: "10.0.0.1".parse().unwrap(),
                remote: None,
                base_dir: PathBuf::from("/srv/m0"),
            },
            MachineSpec {
                name: "m1".to_string(),
                os: "linux".to_string(),
                ip: "10.0.0.2".parse().unwrap(),
                remote: None,
                base_dir: PathBuf::from("/srv/m1"),
            },
        ];
        let nodes = vec![
            NodeSpec { machine: "m0".to_string(), role: Role::Producer, hidden: true, clients: vec![] },
            NodeSpec { machine: "m0".to_string(), role: Role::Agent, hidden: false, clients: vec![0] },
            NodeSpec { machine: "m1".to_string(), role: Role::Watcher, hidden: false, clients: vec![] },
        ];
        let keystore = MemoryKeystore::sequential(nodes.len());
        provision(&machines, &nodes, 7000, &keystore).unwrap()
    }

    fn polarises() -> Vec<String> {
        vec!["/ip4/10.0.0.9/tcp/8915/p2p/16Uiu2HAmPolaris".to_string()]
    }

    #[test]
    fn test_hidden_producer_record() {
        let cluster = agent_cluster();
        let records = render_all(&cluster, &polarises());
        let producer = &records[0];

        assert_eq!(producer.home, "/srv/m0/7000");
        assert_eq!(producer.hostaddr, "10.0.0.1");
        assert_eq!((producer.rpc, producer.p2pport, producer.profport), (7000, 8000, 9000));
        assert_eq!(producer.pkfilename, "node00.key");
        assert!(producer.enablebp);
        assert!(!producer.expose && !producer.discover && !producer.usepolaris);
        assert!(producer.polarises.is_empty());
        assert!(producer.peers.is_empty());
        assert_eq!(producer.role, "producer");
        assert_eq!(producer.agent, "16Uiu2HAmNode0001");
        assert!(producer.producers.is_empty());
    }

    #[test]
    fn test_agent_record() {
        let cluster = agent_cluster();
        let records = render_all(&cluster, &polarises());
        let agent = &records[1];

        assert!(!agent.enablebp);
        assert!(agent.expose && agent.discover && agent.usepolaris);
        assert_eq!(agent.polarises, polarises());
        assert_eq!(agent.role, "agent");
        assert_eq!(agent.agent, "");
        assert_eq!(agent.producers, vec!["16Uiu2HAmNode0000".to_string()]);
        assert_eq!(
            agent.peers,
            vec![
                "/ip4/10.0.0.1/tcp/8000/p2p/16Uiu2HAmNode0000".to_string(),
                "/ip4/10.0.0.2/tcp/8002/p2p/16Uiu2HAmNode0002".to_string(),
            ]
        );
    }

    #[test]
    fn test_watcher_peers_exclude_remote_hidden() {
        let cluster = agent_cluster();
        let records = render_all(&cluster, &[]);
        assert_eq!(
            records[2].peers,
            vec!["/ip4/10.0.0.1/tcp/8001/p2p/16Uiu2HAmNode0001".to_string()]
        );
        assert!(records[2].producers.is_empty());
        assert_eq!(records[2].agent, "");
    }

    #[test]
    fn test_toml_document() {
        let cluster = agent_cluster();
        let records = render_all(&cluster, &polarises());
        assert_eq!(config_file_name(&records[1]), "7001.toml");

        let text = to_toml(&records[1]).unwrap();
        assert!(text.starts_with("# aergo TOML Configuration File"));

        let body: String = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed: NodeConfigDocument = toml::from_str(&body).unwrap();
        assert_eq!(parsed, NodeConfigDocument::from(&records[1]));
        assert_eq!(parsed.p2p.npkey, "/srv/m0/7001/node01.key");
        assert_eq!(parsed.rpc.netserviceport, 7001);
        assert_eq!(parsed.profileport, 9001);
        assert!(!parsed.consensus.enablebp);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let cluster = agent_cluster();
        let first: Vec<String> = render_all(&cluster, &polarises())
            .iter()
            .map(|r| to_toml(r).unwrap())
            .collect();
        let second: Vec<String> = render_all(&cluster, &polarises())
            .iter()
            .map(|r| to_toml(r).unwrap())
            .collect();
        assert_eq!(first, second);
    }
}
