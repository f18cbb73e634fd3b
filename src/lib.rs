//! # Clustergen - Testnet generator for Aergo node clusters
//!
//! This library turns a declarative cluster description into the artifacts
//! needed to bring up an Aergo test network: one TOML config per node, a
//! genesis document and a JSON registry of the provisioned nodes.
//!
//! ## Overview
//!
//! A cluster is a set of machines, each hosting one or more nodes. Every node
//! has a role (producer, watcher or agent) and may be hidden from the public
//! network. Agents front block producers that live on the same machine.
//! Generation runs in one pass per base port:
//!
//! 1. **Provision**: resolve machines, allocate ports, look up peer identities
//!    and wire agent delegations
//! 2. **Connect**: compute which peers every node dials at startup
//! 3. **Render**: produce node configs and the genesis document in memory
//! 4. **Commit**: stage files next to the output directory and move them in
//! 5. **Deliver**: copy configs and genesis onto the cluster machines
//!
//! ## Architecture
//!
//! - `config`: Cluster declaration types and semantic validation
//! - `config_loader`: YAML loading
//! - `keystore`: Peer identity and account address lookup
//! - `topology`: Provisioning and peer visibility
//! - `render`: Node configuration records and TOML output
//! - `genesis`: Genesis balances and document
//! - `registry`: Cluster registry written alongside the artifacts
//! - `distribute`: Local and remote artifact delivery
//! - `orchestrator`: Validate-then-commit generation runs
//! - `utils`: IP helpers and advisory topology checks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use clustergen::config_loader::load_config;
//! use clustergen::keystore::DirKeystore;
//! use clustergen::orchestrator::{generate, Generate};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cluster.yaml"))?;
//! let keystore = DirKeystore::from_config(&config.keystore);
//!
//! let report = generate(&config, Generate::All, 7000, &keystore, Path::new("cluster_output"), None)?;
//! println!("{} node(s) provisioned", report.cluster.nodes().len());
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   test_run: "testnet01"
//!   log_level: info
//!
//! network:
//!   polarises: ["/ip4/203.0.113.9/tcp/8915/p2p/16Uiu2HAm..."]
//!
//! machines:
//!   - name: m0
//!     ip: 10.0.0.1
//!     base_dir: /srv/aergo
//!
//! nodes:
//!   - { machine: m0, role: producer, hidden: true }
//!   - { machine: m0, role: agent, clients: [0] }
//!
//! genesis:
//!   magic: "testnet01.aergo.io"
//!   total_supply: "500000000000000000000000000"
//!   unit_share: "1000000000000000000000"
//!   holders: [0]
//!
//! keystore:
//!   dir: ./keys
//! ```
//!
//! ## Error Handling
//!
//! Domain modules return typed `thiserror` errors; the orchestrator and the
//! binary wrap them with `color_eyre` context.

pub mod config;
pub mod config_loader;
pub mod distribute;
pub mod genesis;
pub mod keystore;
pub mod orchestrator;
pub mod registry;
pub mod render;
pub mod topology;
pub mod utils;
