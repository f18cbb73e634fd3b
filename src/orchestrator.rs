//! Generation orchestrator.
//!
//! This module coordinates one provisioning pass, from the validated cluster
//! declaration to committed (and optionally delivered) artifacts.
//!
//! Generation is validate-then-commit: provisioning, peer graph, rendering
//! and genesis composition all complete in memory before a single file is
//! written. Files are then staged in a sibling directory of the output
//! directory and moved into place, so a failed run never leaves a partial
//! artifact set behind.

use crate::config::Config;
use crate::distribute::{deliver_artifacts, Distributor};
use crate::genesis::{compose_genesis, genesis_file_name, GenesisDocument};
use crate::keystore::Keystore;
use crate::registry::{ClusterRegistry, REGISTRY_FILE};
use crate::render::{config_file_name, render_all, to_toml};
use crate::topology::{provision, ProvisionedCluster};
use crate::utils::log_topology_warnings;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory below the output directory holding node configs
pub const CONFIGS_DIR: &str = "configs";

/// Which artifacts a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generate {
    Configs,
    Genesis,
    All,
}

impl Generate {
    pub fn includes_configs(&self) -> bool {
        matches!(self, Generate::Configs | Generate::All)
    }

    pub fn includes_genesis(&self) -> bool {
        matches!(self, Generate::Genesis | Generate::All)
    }
}

/// A file rendered in memory, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub relative: PathBuf,
    pub contents: String,
}

/// Everything a run will write, before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    /// Node configs keyed by ordinal
    pub configs: Vec<(usize, RenderedFile)>,
    pub genesis: Option<RenderedFile>,
    pub registry: RenderedFile,
}

impl RenderedArtifacts {
    fn files(&self) -> impl Iterator<Item = &RenderedFile> {
        self.configs
            .iter()
            .map(|(_, file)| file)
            .chain(self.genesis.iter())
            .chain(std::iter::once(&self.registry))
    }
}

/// Committed artifact paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub output_dir: PathBuf,
    pub configs: Vec<(usize, PathBuf)>,
    pub genesis: Option<PathBuf>,
    pub registry: PathBuf,
}

/// Outcome of a full generation run
#[derive(Debug)]
pub struct GenerationReport {
    pub cluster: ProvisionedCluster,
    pub artifacts: ArtifactSet,
}

/// Render the requested artifacts for an already provisioned cluster.
///
/// Config rendering and genesis composition share nothing mutable, so they
/// run side by side.
pub fn render_artifacts<K>(
    config: &Config,
    cluster: &ProvisionedCluster,
    what: Generate,
    keystore: &K,
) -> Result<RenderedArtifacts>
where
    K: Keystore + ?Sized,
{
    let (configs, genesis) = rayon::join(
        || render_configs(config, cluster, what),
        || render_genesis(config, cluster, what, keystore),
    );

    let registry = ClusterRegistry::from_cluster(&config.general.test_run, cluster)
        .to_json()
        .wrap_err("Failed to serialize cluster registry")?;

    Ok(RenderedArtifacts {
        configs: configs?,
        genesis: genesis?,
        registry: RenderedFile {
            relative: PathBuf::from(REGISTRY_FILE),
            contents: registry,
        },
    })
}

fn render_configs(
    config: &Config,
    cluster: &ProvisionedCluster,
    what: Generate,
) -> Result<Vec<(usize, RenderedFile)>> {
    if !what.includes_configs() {
        return Ok(Vec::new());
    }

    render_all(cluster, config.polarises())
        .iter()
        .enumerate()
        .map(|(ordinal, record)| -> Result<(usize, RenderedFile)> {
            let contents = to_toml(record)
                .wrap_err_with(|| format!("Failed to render config of node {}", ordinal))?;
            let file = RenderedFile {
                relative: Path::new(CONFIGS_DIR).join(config_file_name(record)),
                contents,
            };
            Ok((ordinal, file))
        })
        .collect()
}

fn render_genesis<K>(
    config: &Config,
    cluster: &ProvisionedCluster,
    what: Generate,
    keystore: &K,
) -> Result<Option<RenderedFile>>
where
    K: Keystore + ?Sized,
{
    if !what.includes_genesis() {
        return Ok(None);
    }

    let params = &config.genesis;
    let genesis = compose_genesis(
        cluster,
        &params.holders,
        params.total_supply,
        params.unit_share,
        keystore,
    )
    .wrap_err("Genesis composition failed")?;

    let contents = GenesisDocument::new(&params.magic, params.timestamp, &genesis)
        .to_json()
        .wrap_err("Failed to serialize genesis")?;

    Ok(Some(RenderedFile {
        relative: PathBuf::from(genesis_file_name(&config.general.test_run)),
        contents,
    }))
}

/// Staging directory used while committing into `output_dir`
fn staging_dir(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let parent = output_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}.staging-{}", name, std::process::id()))
}

/// Write rendered artifacts into `output_dir`.
///
/// Files are first written to a staging directory; only when all of them
/// are written are they moved into the output directory. Files they replace
/// are set aside in the staging directory, so a move that fails partway
/// restores the previous contents of the output directory. The staging
/// directory is removed whether or not the commit succeeds.
pub fn commit_artifacts(rendered: &RenderedArtifacts, output_dir: &Path) -> Result<ArtifactSet> {
    let staging = staging_dir(output_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging).wrap_err_with(|| {
            format!("Failed to remove stale staging directory '{}'", staging.display())
        })?;
    }

    let result = stage_and_publish(rendered, &staging, output_dir);

    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!("Failed to remove staging directory '{}': {}", staging.display(), e);
        }
    }
    result
}

fn stage_and_publish(
    rendered: &RenderedArtifacts,
    staging: &Path,
    output_dir: &Path,
) -> Result<ArtifactSet> {
    for file in rendered.files() {
        write_file(&staging.join(&file.relative), &file.contents)?;
    }

    for file in rendered.files() {
        let to = output_dir.join(&file.relative);
        if to.is_dir() {
            return Err(eyre!(
                "Cannot publish '{}': a directory is in the way",
                to.display()
            ));
        }
    }

    let backups = staging.join(REPLACED_DIR);
    let mut published = Vec::new();
    for file in rendered.files() {
        if let Err(e) = publish_file(file, staging, &backups, output_dir, &mut published) {
            rollback(&published);
            return Err(e);
        }
    }

    Ok(ArtifactSet {
        output_dir: output_dir.to_path_buf(),
        configs: rendered
            .configs
            .iter()
            .map(|(ordinal, file)| (*ordinal, output_dir.join(&file.relative)))
            .collect(),
        genesis: rendered
            .genesis
            .as_ref()
            .map(|file| output_dir.join(&file.relative)),
        registry: output_dir.join(&rendered.registry.relative),
    })
}

/// Staging subdirectory keeping the files a commit replaces until it succeeds
const REPLACED_DIR: &str = ".replaced";

/// A file moved into the output directory, with the file it replaced
#[derive(Debug)]
struct Published {
    target: PathBuf,
    backup: Option<PathBuf>,
}

fn publish_file(
    file: &RenderedFile,
    staging: &Path,
    backups: &Path,
    output_dir: &Path,
    published: &mut Vec<Published>,
) -> Result<()> {
    let from = staging.join(&file.relative);
    let to = output_dir.join(&file.relative);
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory '{}'", parent.display()))?;
    }

    let backup = if to.exists() {
        let backup = backups.join(&file.relative);
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory '{}'", parent.display()))?;
        }
        fs::rename(&to, &backup)
            .wrap_err_with(|| format!("Failed to set aside '{}'", to.display()))?;
        Some(backup)
    } else {
        None
    };

    published.push(Published {
        target: to.clone(),
        backup,
    });
    fs::rename(&from, &to)
        .wrap_err_with(|| format!("Failed to move '{}' to '{}'", from.display(), to.display()))
}

/// Undo published files newest first, restoring whatever they replaced
fn rollback(published: &[Published]) {
    for entry in published.iter().rev() {
        if let Err(e) = fs::remove_file(&entry.target) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove '{}': {}", entry.target.display(), e);
            }
        }
        if let Some(backup) = &entry.backup {
            if let Err(e) = fs::rename(backup, &entry.target) {
                warn!("Failed to restore '{}': {}", entry.target.display(), e);
            }
        }
    }
    debug!("Rolled back {} published file(s)", published.len());
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, contents).wrap_err_with(|| format!("Failed to write '{}'", path.display()))
}

/// Run one provisioning pass: provision, render, commit, then deliver.
pub fn generate<K>(
    config: &Config,
    what: Generate,
    base_port: u16,
    keystore: &K,
    output_dir: &Path,
    distributor: Option<&dyn Distributor>,
) -> Result<GenerationReport>
where
    K: Keystore + ?Sized,
{
    config.validate()?;

    info!("Provisioning {} node(s) from base port {}", config.nodes.len(), base_port);
    let cluster = provision(&config.machines, &config.nodes, base_port, keystore)
        .wrap_err("Provisioning failed")?;
    log_topology_warnings(&cluster, config.polarises());

    let rendered = render_artifacts(config, &cluster, what, keystore)?;
    let artifacts = commit_artifacts(&rendered, output_dir)?;
    info!(
        "Wrote {} config(s){} to {}",
        artifacts.configs.len(),
        if artifacts.genesis.is_some() { " and genesis" } else { "" },
        output_dir.display()
    );

    if let Some(distributor) = distributor {
        deliver_artifacts(
            distributor,
            &cluster,
            &artifacts.configs,
            artifacts.genesis.as_deref(),
        )
        .wrap_err("Artifact delivery failed")?;
    }

    Ok(GenerationReport { cluster, artifacts })
}
