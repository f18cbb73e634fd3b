//! Advisory topology checks.
//!
//! These checks never abort a run. They flag provisioned clusters that are
//! valid but will probably not behave as intended once started.

use crate::topology::ProvisionedCluster;
use crate::utils::ip_utils::is_private_ip;

/// Check that every hidden node can reach the network.
///
/// A hidden node only bootstraps against the nodes on its own machine, so at
/// least one of them must be public.
///
/// # Returns
/// One warning per hidden node whose machine hosts no public node
pub fn check_hidden_reachability(cluster: &ProvisionedCluster) -> Vec<String> {
    cluster
        .nodes()
        .iter()
        .filter(|node| node.hidden)
        .filter(|node| {
            !cluster
                .machine_of(node)
                .nodes
                .iter()
                .filter_map(|&ordinal| cluster.node(ordinal))
                .any(|peer| peer.is_public())
        })
        .map(|node| {
            format!(
                "Hidden {} {} on machine '{}' has no public node to bootstrap through",
                node.role,
                node.ordinal,
                cluster.machine_of(node).spec.name
            )
        })
        .collect()
}

/// Check that public nodes advertise addresses polaris servers will accept.
///
/// Polaris ignores private and loopback addresses unless explicitly told
/// otherwise, so public nodes on such machines never appear in its lists.
pub fn check_polaris_addresses(cluster: &ProvisionedCluster, polarises: &[String]) -> Vec<String> {
    if polarises.is_empty() {
        return Vec::new();
    }

    cluster
        .machines()
        .iter()
        .filter(|machine| is_private_ip(&machine.spec.ip))
        .filter(|machine| {
            machine
                .nodes
                .iter()
                .filter_map(|&ordinal| cluster.node(ordinal))
                .any(|node| node.is_public())
        })
        .map(|machine| {
            format!(
                "Machine '{}' uses private address {}; polaris will not list its public nodes unless allowprivate is set",
                machine.spec.name, machine.spec.ip
            )
        })
        .collect()
}

/// Agents without clients front nothing; usually a missing `clients` list
pub fn check_idle_agents(cluster: &ProvisionedCluster) -> Vec<String> {
    cluster
        .agents()
        .iter()
        .filter(|&&agent| cluster.delegations().producers_of(agent).is_empty())
        .map(|agent| format!("Agent {} fronts no producers", agent))
        .collect()
}

/// Run all advisory checks and log their findings
pub fn log_topology_warnings(cluster: &ProvisionedCluster, polarises: &[String]) -> usize {
    let mut warnings = check_hidden_reachability(cluster);
    warnings.extend(check_polaris_addresses(cluster, polarises));
    warnings.extend(check_idle_agents(cluster));

    if cluster.producers().is_empty() {
        warnings.push("Cluster has no producers; the genesis producer set will be empty".to_string());
    }

    for warning in &warnings {
        log::warn!("{}", warning);
    }
    warnings.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MachineSpec, NodeSpec, Role};
    use crate::keystore::MemoryKeystore;
    use crate::topology::provision;
    use std::path::PathBuf;

    fn cluster(ips: &[&str], layout: &[(usize, Role, bool, Vec<usize>)]) -> ProvisionedCluster {
        let machines: Vec<MachineSpec> = ips
            .iter()
            .enumerate()
            .map(|(i, ip)| MachineSpec {
                name: format!("m{}", i),
                os: "linux".to_string(),
                ip: ip.parse().unwrap(),
                remote: None,
                base_dir: PathBuf::from("/srv"),
            })
            .collect();
        let nodes: Vec<NodeSpec> = layout
            .iter()
            .map(|(machine, role, hidden, clients)| NodeSpec {
                machine: format!("m{}", machine),
                role: *role,
                hidden: *hidden,
                clients: clients.clone(),
            })
            .collect();
        provision(&machines, &nodes, 7000, &MemoryKeystore::sequential(nodes.len())).unwrap()
    }

    #[test]
    fn test_isolated_hidden_node() {
        let cluster = cluster(
            &["203.0.113.1", "203.0.113.2"],
            &[
                (0, Role::Producer, true, vec![]),
                (0, Role::Agent, false, vec![0]),
                (1, Role::Producer, true, vec![]),
            ],
        );
        let warnings = check_hidden_reachability(&cluster);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("producer 2"));
        assert!(warnings[0].contains("'m1'"));
    }

    #[test]
    fn test_private_addresses_with_polaris() {
        let cluster = cluster(
            &["10.0.0.1", "203.0.113.2"],
            &[(0, Role::Watcher, false, vec![]), (1, Role::Watcher, false, vec![])],
        );
        assert!(check_polaris_addresses(&cluster, &[]).is_empty());

        let polarises = vec!["/ip4/203.0.113.9/tcp/8915/p2p/16Uiu2HAmPolaris".to_string()];
        let warnings = check_polaris_addresses(&cluster, &polarises);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("10.0.0.1"));
    }

    #[test]
    fn test_idle_agent_and_summary() {
        let cluster = cluster(
            &["203.0.113.1"],
            &[(0, Role::Agent, false, vec![]), (0, Role::Watcher, false, vec![])],
        );
        assert_eq!(check_idle_agents(&cluster), vec!["Agent 0 fronts no producers".to_string()]);
        // idle agent + no producers
        assert_eq!(log_topology_warnings(&cluster, &[]), 2);
    }
}
