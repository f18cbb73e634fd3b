use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

/// Role a node plays in the cluster
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Block producer, allowed to create blocks
    Producer,
    /// Passive observer node
    Watcher,
    /// Public front for one or more colocated producers
    Agent,
}

impl Role {
    /// Returns the role name as written into node configs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Watcher => "watcher",
            Role::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token amount used for genesis balances.
///
/// Accepted in YAML either as an integer or as a decimal string, since
/// realistic supplies do not fit in a YAML integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u128);

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Number(u64),
            Text(String),
        }

        match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(n) => Ok(Amount(u128::from(n))),
            RawAmount::Text(text) => text
                .trim()
                .parse::<u128>()
                .map(Amount)
                .map_err(|e| D::Error::custom(format!("invalid amount '{}': {}", text, e))),
        }
    }
}

/// Full cluster declaration as read from the topology YAML file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub machines: Vec<MachineSpec>,
    pub nodes: Vec<NodeSpec>,
    pub genesis: GenesisConfig,
    pub keystore: KeystoreConfig,
}

impl Config {
    /// Validate the declaration before anything is provisioned
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.test_run.trim().is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "test_run cannot be empty".to_string(),
            ));
        }

        if self.machines.is_empty() {
            return Err(ValidationError::NoMachines);
        }
        if self.nodes.is_empty() {
            return Err(ValidationError::NoNodes);
        }

        let mut names = HashSet::new();
        for machine in &self.machines {
            if !names.insert(machine.name.as_str()) {
                return Err(ValidationError::DuplicateMachine(machine.name.clone()));
            }
        }

        for (ordinal, node) in self.nodes.iter().enumerate() {
            if !names.contains(node.machine.as_str()) {
                return Err(ValidationError::UnknownMachine {
                    ordinal,
                    machine: node.machine.clone(),
                });
            }
            if node.role != Role::Agent && !node.clients.is_empty() {
                return Err(ValidationError::ClientsOnNonAgent {
                    ordinal,
                    role: node.role,
                });
            }
        }

        self.validate_genesis()
    }

    fn validate_genesis(&self) -> Result<(), ValidationError> {
        let genesis = &self.genesis;
        if genesis.magic.trim().is_empty() {
            return Err(ValidationError::InvalidGenesis(
                "magic cannot be empty".to_string(),
            ));
        }
        if genesis.holders.is_empty() {
            return Err(ValidationError::InvalidGenesis(
                "holders must name at least one node".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for &holder in &genesis.holders {
            if holder >= self.nodes.len() {
                return Err(ValidationError::HolderOutOfRange {
                    holder,
                    node_count: self.nodes.len(),
                });
            }
            if !seen.insert(holder) {
                return Err(ValidationError::DuplicateHolder(holder));
            }
        }

        let others = (genesis.holders.len() - 1) as u128;
        let distributed = genesis.unit_share.0.checked_mul(others);
        match distributed {
            Some(sum) if sum <= genesis.total_supply.0 => Ok(()),
            _ => Err(ValidationError::InvalidGenesis(format!(
                "unit_share {} for {} holders exceeds total_supply {}",
                genesis.unit_share,
                others,
                genesis.total_supply
            ))),
        }
    }

    /// Polaris addresses handed to every publicly visible node
    pub fn polarises(&self) -> &[String] {
        &self.network.polarises
    }
}

/// Run-wide settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Identifier of the test run, used to name the genesis file
    pub test_run: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Network-wide discovery settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NetworkConfig {
    /// Multiaddresses of the external bootstrap (polaris) servers
    #[serde(default)]
    pub polarises: Vec<String>,
}

/// A host that runs one or more nodes
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MachineSpec {
    pub name: String,
    #[serde(default = "default_os")]
    pub os: String,
    pub ip: IpAddr,
    /// Connection details; absent means the machine is this host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteHost>,
    /// Directory on the machine under which node homes are created
    pub base_dir: PathBuf,
}

/// Secure-shell connection descriptor for a remote machine
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub user: String,
}

impl RemoteHost {
    /// `user@host` target understood by ssh
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Node declaration; derived fields are filled in by the provisioner
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Name of the owning machine
    pub machine: String,
    pub role: Role,
    /// Hidden nodes are left out of the public bootstrap set
    #[serde(default)]
    pub hidden: bool,
    /// Ordinals of the producers an agent fronts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clients: Vec<usize>,
}

/// Genesis ledger parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenesisConfig {
    pub magic: String,
    pub total_supply: Amount,
    pub unit_share: Amount,
    /// Balance recipients; the first entry absorbs the remainder
    pub holders: Vec<usize>,
    #[serde(default)]
    pub timestamp: i64,
}

/// Where node keys live and how they are named
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeystoreConfig {
    pub dir: PathBuf,
    #[serde(default = "default_key_prefix")]
    pub prefix: String,
    /// Key generation binary used to create missing key material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keygen: Option<PathBuf>,
}

fn default_os() -> String {
    "linux".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_key_prefix() -> String {
    "node".to_string()
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("At least one machine must be declared")]
    NoMachines,
    #[error("At least one node must be declared")]
    NoNodes,
    #[error("Machine '{0}' is declared more than once")]
    DuplicateMachine(String),
    #[error("Node {ordinal} references undeclared machine '{machine}'")]
    UnknownMachine { ordinal: usize, machine: String },
    #[error("Node {ordinal} has role {role} but declares clients; only agents front producers")]
    ClientsOnNonAgent { ordinal: usize, role: Role },
    #[error("Invalid genesis configuration: {0}")]
    InvalidGenesis(String),
    #[error("Genesis holder {holder} is out of range ({node_count} nodes declared)")]
    HolderOutOfRange { holder: usize, node_count: usize },
    #[error("Genesis holder {0} is listed more than once")]
    DuplicateHolder(usize),
}
