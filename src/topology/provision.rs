//! Node provisioning.
//!
//! Provisioning runs in two passes over the declared nodes:
//!
//! 1. **Identity pass**: every node gets its ports, peer identity, key file,
//!    multiaddress and home directory; machines collect their hosted
//!    ordinals and nodes are partitioned into producers, agents and public
//!    nodes.
//! 2. **Delegation pass**: every agent's client list is checked (clients must
//!    be producers on the agent's machine) and the agent/producer association
//!    table is built.
//!
//! Nothing is returned until both passes succeed, so a failed run never
//! exposes a partially wired cluster.

use super::types::{
    Delegations, MachineSpec, NodePorts, NodeSpec, ProvisionedCluster, ProvisionedMachine,
    ProvisionedNode, Role, MAX_NODES,
};
use crate::keystore::{Keystore, KeystoreError, PeerId};
use crate::utils::ip_utils::multiaddr;
use log::{debug, info};
use rayon::prelude::*;

/// Errors that abort provisioning
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Cannot provision {count} nodes: at most {max} fit below the p2p port tier", max = MAX_NODES - 1)]
    PortTierOverlap { count: usize },

    #[error("Base port {base_port} leaves no room for {count} nodes below port 65535")]
    PortOverflow { base_port: u16, count: usize },

    #[error("Node {ordinal} references undeclared machine '{machine}'")]
    UnknownMachine { ordinal: usize, machine: String },

    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error("Agent {agent} declares client {client}, which does not exist")]
    UnknownClient { agent: usize, client: usize },

    #[error("Agent {agent} declares client {client}, which is a {role} rather than a producer")]
    ClientNotProducer { agent: usize, client: usize, role: Role },

    #[error(
        "Colocation violation: agent {agent} on machine '{agent_machine}' fronts producer {client} on machine '{client_machine}'"
    )]
    ColocationViolation {
        agent: usize,
        client: usize,
        agent_machine: String,
        client_machine: String,
    },

    #[error("Producer {producer} is fronted by both agent {first} and agent {second}")]
    ProducerAlreadyFronted {
        producer: usize,
        first: usize,
        second: usize,
    },
}

/// Provision the declared nodes starting at `base_port`.
///
/// Given the same declaration, base port and keystore contents the result is
/// identical on every call.
pub fn provision<K>(
    machines: &[MachineSpec],
    nodes: &[NodeSpec],
    base_port: u16,
    keystore: &K,
) -> Result<ProvisionedCluster, ProvisionError>
where
    K: Keystore + ?Sized,
{
    check_port_range(base_port, nodes.len())?;

    let placement = resolve_machines(machines, nodes)?;
    let identities = resolve_identities(nodes.len(), keystore)?;

    let mut cluster = ProvisionedCluster {
        base_port,
        machines: machines
            .iter()
            .map(|spec| ProvisionedMachine {
                spec: spec.clone(),
                nodes: Vec::new(),
            })
            .collect(),
        nodes: Vec::with_capacity(nodes.len()),
        producers: Vec::new(),
        agents: Vec::new(),
        public: Vec::new(),
        delegations: Delegations::default(),
    };

    // Pass 1: identity
    for ((ordinal, spec), (machine, peer_id)) in nodes
        .iter()
        .enumerate()
        .zip(placement.into_iter().zip(identities))
    {
        let ports = NodePorts::for_ordinal(base_port, ordinal).ok_or(
            ProvisionError::PortOverflow {
                base_port,
                count: nodes.len(),
            },
        )?;
        let host = &mut cluster.machines[machine];
        host.nodes.push(ordinal);

        let node = ProvisionedNode {
            ordinal,
            machine,
            role: spec.role,
            hidden: spec.hidden,
            clients: spec.clients.clone(),
            ports,
            multiaddr: multiaddr(&host.spec.ip, ports.p2p, peer_id.as_str()),
            peer_id,
            key_file: keystore.key_file_name(ordinal),
            home: host.spec.base_dir.join(ports.rpc.to_string()),
        };
        debug!(
            "Node {} ({}) on '{}': rpc={} p2p={} prof={} hidden={}",
            ordinal, node.role, host.spec.name, ports.rpc, ports.p2p, ports.prof, node.hidden
        );

        match node.role {
            Role::Producer => cluster.producers.push(ordinal),
            Role::Agent => cluster.agents.push(ordinal),
            Role::Watcher => {}
        }
        if node.is_public() {
            cluster.public.push(ordinal);
        }
        cluster.nodes.push(node);
    }

    // Pass 2: delegation
    cluster.delegations = wire_delegations(&cluster)?;

    info!(
        "Provisioned {} node(s) on {} machine(s): {} producer(s), {} agent(s), {} public",
        cluster.nodes.len(),
        cluster.machines.len(),
        cluster.producers.len(),
        cluster.agents.len(),
        cluster.public.len()
    );
    Ok(cluster)
}

fn check_port_range(base_port: u16, count: usize) -> Result<(), ProvisionError> {
    if count >= MAX_NODES {
        return Err(ProvisionError::PortTierOverlap { count });
    }
    if count > 0 && NodePorts::for_ordinal(base_port, count - 1).is_none() {
        return Err(ProvisionError::PortOverflow { base_port, count });
    }
    Ok(())
}

/// Machine index of every node
fn resolve_machines(
    machines: &[MachineSpec],
    nodes: &[NodeSpec],
) -> Result<Vec<usize>, ProvisionError> {
    nodes
        .iter()
        .enumerate()
        .map(|(ordinal, node)| {
            machines
                .iter()
                .position(|m| m.name == node.machine)
                .ok_or_else(|| ProvisionError::UnknownMachine {
                    ordinal,
                    machine: node.machine.clone(),
                })
        })
        .collect()
}

/// Look up all identities in parallel; the lowest failing ordinal is reported
fn resolve_identities<K>(count: usize, keystore: &K) -> Result<Vec<PeerId>, ProvisionError>
where
    K: Keystore + ?Sized,
{
    let lookups: Vec<Result<PeerId, KeystoreError>> = (0..count)
        .into_par_iter()
        .map(|ordinal| keystore.identity(ordinal))
        .collect();

    lookups
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(ProvisionError::from)
}

fn wire_delegations(cluster: &ProvisionedCluster) -> Result<Delegations, ProvisionError> {
    let mut delegations = Delegations::default();

    for &agent in &cluster.agents {
        let agent_node = &cluster.nodes[agent];
        let agent_machine = &cluster.machines[agent_node.machine].spec;
        let mut fronted = Vec::with_capacity(agent_node.clients.len());

        for &client in &agent_node.clients {
            let client_node = cluster
                .nodes
                .get(client)
                .ok_or(ProvisionError::UnknownClient { agent, client })?;

            if client_node.role != Role::Producer {
                return Err(ProvisionError::ClientNotProducer {
                    agent,
                    client,
                    role: client_node.role,
                });
            }

            let client_machine = &cluster.machines[client_node.machine].spec;
            if agent_machine != client_machine {
                return Err(ProvisionError::ColocationViolation {
                    agent,
                    client,
                    agent_machine: agent_machine.name.clone(),
                    client_machine: client_machine.name.clone(),
                });
            }

            if let Some(&first) = delegations.agent_of.get(&client) {
                return Err(ProvisionError::ProducerAlreadyFronted {
                    producer: client,
                    first,
                    second: agent,
                });
            }
            delegations.agent_of.insert(client, agent);
            fronted.push(client);
        }

        debug!("Agent {} fronts producers {:?}", agent, fronted);
        delegations.producers_of.insert(agent, fronted);
    }

    Ok(delegations)
}
