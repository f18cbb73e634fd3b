//! Node configuration record and its on-disk document layout.

use serde::{Deserialize, Serialize};

/// Everything a node config template needs, one field per placeholder.
///
/// This field set is exhaustive: templates may lay it out however they
/// like, but must not need anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Node home directory on its machine
    pub home: String,
    /// Address advertised for rpc and p2p
    pub hostaddr: String,
    pub rpc: u16,
    pub p2pport: u16,
    pub profport: u16,
    /// Private key file name
    pub pkfilename: String,
    /// Block production enabled (producers only)
    pub enablebp: bool,
    /// Ask polaris and peers to advertise this node
    pub expose: bool,
    /// Discover further peers beyond the bootstrap list
    pub discover: bool,
    /// Register with the external polaris servers
    pub usepolaris: bool,
    pub polarises: Vec<String>,
    pub role: String,
    /// Peer id of the fronting agent, empty if none
    pub agent: String,
    /// Peer ids of fronted producers, empty unless the node is an agent
    pub producers: Vec<String>,
    /// Bootstrap peer multiaddresses in ascending ordinal order
    pub peers: Vec<String>,
}

/// TOML layout of a node config file.
///
/// Top-level scalars must precede the section tables for TOML output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfigDocument {
    pub datadir: String,
    pub authdir: String,
    pub enableprofile: bool,
    pub profileport: u16,
    pub rpc: RpcSection,
    pub p2p: P2pSection,
    pub consensus: ConsensusSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSection {
    pub netserviceaddr: String,
    pub netserviceport: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2pSection {
    pub netprotocoladdr: String,
    pub netprotocolport: u16,
    pub npbindport: u16,
    pub npkey: String,
    pub npexposeself: bool,
    pub npdiscoverpeers: bool,
    pub npusepolaris: bool,
    pub npaddpolarises: Vec<String>,
    pub npaddpeers: Vec<String>,
    pub peerrole: String,
    pub agent: String,
    pub producers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSection {
    pub enablebp: bool,
}

impl From<&ConfigRecord> for NodeConfigDocument {
    fn from(record: &ConfigRecord) -> Self {
        Self {
            datadir: format!("{}/data", record.home),
            authdir: format!("{}/auth", record.home),
            enableprofile: true,
            profileport: record.profport,
            rpc: RpcSection {
                netserviceaddr: record.hostaddr.clone(),
                netserviceport: record.rpc,
            },
            p2p: P2pSection {
                netprotocoladdr: record.hostaddr.clone(),
                netprotocolport: record.p2pport,
                npbindport: record.p2pport,
                npkey: format!("{}/{}", record.home, record.pkfilename),
                npexposeself: record.expose,
                npdiscoverpeers: record.discover,
                npusepolaris: record.usepolaris,
                npaddpolarises: record.polarises.clone(),
                npaddpeers: record.peers.clone(),
                peerrole: record.role.clone(),
                agent: record.agent.clone(),
                producers: record.producers.clone(),
            },
            consensus: ConsensusSection {
                enablebp: record.enablebp,
            },
        }
    }
}
