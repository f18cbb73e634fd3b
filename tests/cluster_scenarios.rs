//! End-to-end generation runs against in-memory key material.

use clustergen::config::{Amount, Config};
use clustergen::genesis::{compose_genesis, GenesisDocument};
use clustergen::keystore::{Address, MemoryKeystore};
use clustergen::orchestrator::{generate, Generate};
use clustergen::registry::{ClusterRegistry, REGISTRY_FILE};
use clustergen::render::NodeConfigDocument;
use clustergen::topology::{provision, ProvisionError};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config_from(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).unwrap()
}

/// Two producers on m0 and a public watcher on m1
const SCENARIO_A: &str = r#"
general:
  test_run: "scenario-a"
machines:
  - name: m0
    ip: 10.0.0.1
    base_dir: /srv/aergo
  - name: m1
    ip: 10.0.0.2
    base_dir: /srv/aergo
nodes:
  - { machine: m0, role: producer }
  - { machine: m0, role: producer }
  - { machine: m1, role: watcher }
genesis:
  magic: "scenario-a.aergo.io"
  total_supply: 500000000
  unit_share: 10000000
  holders: [0, 2]
keystore:
  dir: keys
"#;

/// Agent on m0 fronting a producer on m1
const SCENARIO_C: &str = r#"
general:
  test_run: "scenario-c"
machines:
  - name: m0
    ip: 10.0.0.1
    base_dir: /srv/aergo
  - name: m1
    ip: 10.0.0.2
    base_dir: /srv/aergo
nodes:
  - { machine: m0, role: agent, clients: [1] }
  - { machine: m1, role: producer, hidden: true }
genesis:
  magic: "scenario-c.aergo.io"
  total_supply: 500000000
  unit_share: 10000000
  holders: [0]
keystore:
  dir: keys
"#;

/// Hidden producers behind an agent plus a watcher, across two machines
const FRONTED: &str = r#"
general:
  test_run: "fronted"
network:
  polarises: ["/ip4/203.0.113.9/tcp/8915/p2p/16Uiu2HAmPolaris"]
machines:
  - name: m0
    ip: 203.0.113.1
    base_dir: /srv/aergo
  - name: m1
    ip: 203.0.113.2
    base_dir: /srv/aergo
nodes:
  - { machine: m0, role: producer, hidden: true }
  - { machine: m0, role: producer, hidden: true }
  - { machine: m0, role: agent, clients: [0, 1] }
  - { machine: m1, role: watcher }
genesis:
  magic: "fronted.aergo.io"
  total_supply: "1000000000000000000000000000"
  unit_share: "1000000000000000000000"
  holders: [2, 0, 3]
  timestamp: 1700000000
keystore:
  dir: keys
"#;

fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

#[test]
fn test_scenario_a_ports_and_peers() {
    let config = config_from(SCENARIO_A);
    let cluster = provision(
        &config.machines,
        &config.nodes,
        7000,
        &MemoryKeystore::sequential(3),
    )
    .unwrap();

    let ports: Vec<(u16, u16, u16)> = cluster
        .nodes()
        .iter()
        .map(|node| (node.ports.rpc, node.ports.p2p, node.ports.prof))
        .collect();
    assert_eq!(
        ports,
        vec![(7000, 8000, 9000), (7001, 8001, 9001), (7002, 8002, 9002)]
    );

    assert_eq!(cluster.visible_peers(2), BTreeSet::from([0, 1]));
    assert_eq!(cluster.visible_peers(0), BTreeSet::from([1, 2]));
    assert_eq!(
        cluster.node(2).unwrap().multiaddr,
        "/ip4/10.0.0.2/tcp/8002/p2p/16Uiu2HAmNode0002"
    );
}

#[test]
fn test_scenario_b_genesis_balances() {
    let machines = config_from(SCENARIO_A).machines;
    let nodes: Vec<_> = (0..9)
        .map(|i| clustergen::config::NodeSpec {
            machine: if i % 2 == 0 { "m0" } else { "m1" }.to_string(),
            role: clustergen::config::Role::Producer,
            hidden: false,
            clients: vec![],
        })
        .collect();
    let keystore = MemoryKeystore::sequential(9);
    let cluster = provision(&machines, &nodes, 7000, &keystore).unwrap();

    let genesis = compose_genesis(
        &cluster,
        &[0, 4, 8],
        Amount(500_000_000),
        Amount(10_000_000),
        &keystore,
    )
    .unwrap();

    let balance = |ordinal: usize| {
        genesis
            .balance_of(&Address(format!("AmNode{:04}Address", ordinal)))
            .unwrap()
    };
    assert_eq!(balance(4), Amount(10_000_000));
    assert_eq!(balance(8), Amount(10_000_000));
    assert_eq!(balance(0), Amount(480_000_000));
    assert_eq!(genesis.total(), 500_000_000);
    assert_eq!(genesis.producers.len(), 9);
}

#[test]
fn test_scenario_c_aborts_without_artifacts() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let config = config_from(SCENARIO_C);

    let err = generate(
        &config,
        Generate::All,
        7000,
        &MemoryKeystore::sequential(2),
        &output,
        None,
    )
    .unwrap_err();

    let provision_error = err
        .chain()
        .find_map(|e| e.downcast_ref::<ProvisionError>())
        .expect("provisioning error in chain");
    assert!(matches!(
        provision_error,
        ProvisionError::ColocationViolation { agent: 0, client: 1, .. }
    ));
    assert_eq!(count_files(temp.path()), 0);
}

#[test]
fn test_missing_key_material_aborts_without_artifacts() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let config = config_from(FRONTED);

    let mut keystore = MemoryKeystore::sequential(4);
    keystore.remove_address(3);

    // Configs need no addresses
    generate(&config, Generate::Configs, 7000, &keystore, &output, None).unwrap();
    let after_configs = count_files(temp.path());
    assert_eq!(after_configs, 5);

    // Genesis does, and fails before anything new is written
    assert!(generate(&config, Generate::Genesis, 7000, &keystore, &output, None).is_err());
    assert_eq!(count_files(temp.path()), after_configs);
    assert!(!output.join("genesis_fronted.json").exists());
}

#[test]
fn test_full_generation() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    let config = config_from(FRONTED);
    let keystore = MemoryKeystore::sequential(4);

    let report = generate(&config, Generate::All, 7100, &keystore, &output, None).unwrap();

    assert_eq!(report.artifacts.configs.len(), 4);
    assert_eq!(
        report.artifacts.genesis.as_deref(),
        Some(output.join("genesis_fronted.json").as_path())
    );

    // Hidden producer: no bootstrap peers, fronted by the agent
    let producer: NodeConfigDocument =
        toml::from_str(&fs::read_to_string(output.join("configs/7100.toml")).unwrap()).unwrap();
    assert!(producer.consensus.enablebp);
    assert!(!producer.p2p.npexposeself);
    assert!(producer.p2p.npaddpeers.is_empty());
    assert!(producer.p2p.npaddpolarises.is_empty());
    assert_eq!(producer.p2p.agent, "16Uiu2HAmNode0002");
    assert_eq!(producer.p2p.npkey, "/srv/aergo/7100/node00.key");
    assert_eq!(producer.p2p.netprotocolport, 8100);
    assert_eq!(producer.profileport, 9100);

    // Agent: public, sees its producers and the remote watcher
    let agent: NodeConfigDocument =
        toml::from_str(&fs::read_to_string(output.join("configs/7102.toml")).unwrap()).unwrap();
    assert!(!agent.consensus.enablebp);
    assert_eq!(agent.p2p.peerrole, "agent");
    assert_eq!(
        agent.p2p.producers,
        vec!["16Uiu2HAmNode0000".to_string(), "16Uiu2HAmNode0001".to_string()]
    );
    assert_eq!(
        agent.p2p.npaddpeers,
        vec![
            "/ip4/203.0.113.1/tcp/8100/p2p/16Uiu2HAmNode0000".to_string(),
            "/ip4/203.0.113.1/tcp/8101/p2p/16Uiu2HAmNode0001".to_string(),
            "/ip4/203.0.113.2/tcp/8103/p2p/16Uiu2HAmNode0003".to_string(),
        ]
    );
    assert_eq!(agent.p2p.npaddpolarises.len(), 1);

    // Watcher only reaches the agent
    let watcher: NodeConfigDocument =
        toml::from_str(&fs::read_to_string(output.join("configs/7103.toml")).unwrap()).unwrap();
    assert_eq!(
        watcher.p2p.npaddpeers,
        vec!["/ip4/203.0.113.1/tcp/8102/p2p/16Uiu2HAmNode0002".to_string()]
    );

    let genesis: GenesisDocument =
        serde_json::from_str(&fs::read_to_string(output.join("genesis_fronted.json")).unwrap())
            .unwrap();
    assert_eq!(genesis.chain_id.magic, "fronted.aergo.io");
    assert_eq!(genesis.timestamp, 1_700_000_000);
    assert_eq!(genesis.bps, vec!["16Uiu2HAmNode0000", "16Uiu2HAmNode0001"]);
    assert_eq!(
        genesis.balance["AmNode0002Address"],
        "999998000000000000000000000"
    );
    assert_eq!(genesis.balance["AmNode0000Address"], "1000000000000000000000");
    assert_eq!(genesis.balance.len(), 3);

    let registry: ClusterRegistry =
        serde_json::from_str(&fs::read_to_string(output.join(REGISTRY_FILE)).unwrap()).unwrap();
    assert_eq!(registry.test_run, "fronted");
    assert_eq!(registry.nodes.len(), 4);
    assert_eq!(registry.nodes[2].producers.len(), 2);

    // Re-running is idempotent
    let again = generate(&config, Generate::All, 7100, &keystore, &output, None).unwrap();
    assert_eq!(again.cluster, report.cluster);
    assert_eq!(count_files(&output), 6);
}
