use clap::{Parser, Subcommand};
use clustergen::config_loader::load_config;
use clustergen::distribute::{Distributor, HostDistributor};
use clustergen::keystore::DirKeystore;
use clustergen::orchestrator::{generate, Generate};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::{info, LevelFilter};
use std::path::PathBuf;

/// Testnet generator for Aergo node clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the cluster declaration YAML file
    #[arg(short, long, default_value = "cluster.yaml")]
    config: PathBuf,

    /// Output directory for generated configs, genesis and registry
    #[arg(short, long, default_value = "cluster_output")]
    output: PathBuf,

    /// Write artifacts locally without copying them to cluster machines
    #[arg(long)]
    no_deliver: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Generate node configuration files
    Configs {
        /// Base port; rpc, p2p and profiling ports are allocated from it
        port: u16,
    },
    /// Generate the genesis document
    Genesis {
        /// Base port; rpc, p2p and profiling ports are allocated from it
        port: u16,
    },
    /// Generate node configurations and the genesis document
    All {
        /// Base port; rpc, p2p and profiling ports are allocated from it
        port: u16,
    },
}

impl Command {
    fn plan(&self) -> (Generate, u16) {
        match *self {
            Command::Configs { port } => (Generate::Configs, port),
            Command::Genesis { port } => (Generate::Genesis, port),
            Command::All { port } => (Generate::All, port),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // RUST_LOG wins; otherwise the level comes from the cluster file once loaded
    let from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }

    let config = load_config(&args.config)?;
    if let (false, Some(level)) = (from_env, &config.general.log_level) {
        let level: LevelFilter = level
            .parse()
            .map_err(|_| eyre!("Invalid log_level '{}' in {:?}", level, args.config))?;
        log::set_max_level(level);
    }

    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let keystore = DirKeystore::from_config(&config.keystore);
    if let Some(keygen) = &config.keystore.keygen {
        let created = keystore
            .ensure_keys(config.nodes.len(), keygen)
            .wrap_err("Key generation failed")?;
        if created > 0 {
            info!("Generated {} new key(s) in {}", created, keystore.dir().display());
        }
    }

    let host = HostDistributor;
    let distributor: Option<&dyn Distributor> = if args.no_deliver { None } else { Some(&host) };

    let (what, port) = args.command.plan();
    let report = generate(&config, what, port, &keystore, &args.output, distributor)?;

    info!(
        "Test run '{}' ready: {} node(s) on {} machine(s)",
        config.general.test_run,
        report.cluster.nodes().len(),
        report.cluster.machines().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["clustergen", "all", "7000"]);

        assert_eq!(args.config, PathBuf::from("cluster.yaml"));
        assert_eq!(args.output, PathBuf::from("cluster_output"));
        assert!(!args.no_deliver);
        assert_eq!(args.command.plan(), (Generate::All, 7000));
    }

    #[test]
    fn test_subcommand_options() {
        let args = Args::parse_from([
            "clustergen",
            "--config", "testnet.yaml",
            "-o", "out",
            "--no-deliver",
            "genesis", "7100",
        ]);

        assert_eq!(args.config, PathBuf::from("testnet.yaml"));
        assert_eq!(args.output, PathBuf::from("out"));
        assert!(args.no_deliver);
        assert_eq!(args.command, Command::Genesis { port: 7100 });
    }

    #[test]
    fn test_missing_port_is_usage_error() {
        let err = Args::try_parse_from(["clustergen", "configs"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        assert!(Args::try_parse_from(["clustergen", "configs", "notaport"]).is_err());
        assert!(Args::try_parse_from(["clustergen"]).is_err());
    }
}
