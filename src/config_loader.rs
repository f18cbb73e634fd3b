use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// Load, parse and validate a cluster declaration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading cluster declaration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open cluster file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse cluster file '{}'", config_path.display()))?;

    config.validate()?;

    info!(
        "Declared {} machine(s), {} node(s), {} genesis holder(s)",
        config.machines.len(),
        config.nodes.len(),
        config.genesis.holders.len()
    );
    warn_unused_machines(&config);

    Ok(config)
}

/// Warn about machines that host no node, usually a misspelled machine reference
fn warn_unused_machines(config: &Config) {
    for machine in &config.machines {
        if !config.nodes.iter().any(|n| n.machine == machine.name) {
            warn!("Machine '{}' ({}) hosts no nodes", machine.name, machine.ip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_cluster_config() {
        let yaml = r#"
general:
  test_run: "local"
machines:
  - name: m0
    ip: 127.0.0.1
    base_dir: /tmp/cluster
nodes:
  - machine: m0
    role: producer
  - machine: m0
    role: watcher
genesis:
  magic: "local.aergo.io"
  total_supply: 1000
  unit_share: 10
  holders: [1, 0]
keystore:
  dir: keys
  prefix: bp
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.genesis.holders, vec![1, 0]);
        assert_eq!(config.keystore.prefix, "bp");
        assert!(config.network.polarises.is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_declaration() {
        let yaml = r#"
general:
  test_run: "local"
machines: []
nodes: []
genesis:
  magic: "local.aergo.io"
  total_supply: 1000
  unit_share: 10
  holders: [0]
keystore:
  dir: keys
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Path::new("/nonexistent/cluster.yaml")).is_err());
    }
}
