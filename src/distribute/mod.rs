//! Artifact delivery to cluster machines.
//!
//! Local machines receive plain file copies. Remote machines are reached
//! with `ssh` using the machine's connection descriptor: directories are
//! created with `mkdir -p` and files are streamed into `cat`. Remote paths
//! are single-quoted for the remote shell.

use crate::config::{MachineSpec, RemoteHost};
use crate::topology::ProvisionedCluster;
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` on machine '{machine}' exited with {status}")]
    CommandFailed {
        command: String,
        machine: String,
        status: String,
    },
}

/// Moves rendered files onto cluster machines
pub trait Distributor {
    /// Make sure `dir` exists on `machine`
    fn ensure_directory(&self, dir: &Path, machine: &MachineSpec) -> Result<(), DistributionError>;

    /// Copy `local` into `dest_dir` on `machine`, keeping its file name
    fn deliver(
        &self,
        local: &Path,
        dest_dir: &Path,
        machine: &MachineSpec,
    ) -> Result<(), DistributionError>;
}

/// Distributor choosing local copy or secure copy per machine
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDistributor;

impl Distributor for HostDistributor {
    fn ensure_directory(&self, dir: &Path, machine: &MachineSpec) -> Result<(), DistributionError> {
        match &machine.remote {
            None => fs::create_dir_all(dir).map_err(|source| DistributionError::Io {
                path: dir.to_path_buf(),
                source,
            }),
            Some(remote) => run(ssh_mkdir_command(remote, dir), machine),
        }
    }

    fn deliver(
        &self,
        local: &Path,
        dest_dir: &Path,
        machine: &MachineSpec,
    ) -> Result<(), DistributionError> {
        match &machine.remote {
            None => {
                let file_name = local.file_name().ok_or_else(|| DistributionError::Io {
                    path: local.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                })?;
                let dest = dest_dir.join(file_name);
                fs::copy(local, &dest)
                    .map(|_| ())
                    .map_err(|source| DistributionError::Io { path: dest, source })
            }
            Some(remote) => {
                let file_name = local.file_name().ok_or_else(|| DistributionError::Io {
                    path: local.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                })?;
                let source = File::open(local).map_err(|source| DistributionError::Io {
                    path: local.to_path_buf(),
                    source,
                })?;
                let mut command = ssh_copy_command(remote, &dest_dir.join(file_name));
                command.stdin(Stdio::from(source));
                run(command, machine)
            }
        }
    }
}

/// `ssh -p <port> user@host mkdir -p '<dir>'`
pub fn ssh_mkdir_command(remote: &RemoteHost, dir: &Path) -> Command {
    let mut command = Command::new("ssh");
    command
        .arg("-p")
        .arg(remote.port.to_string())
        .arg(remote.target())
        .arg(format!("mkdir -p {}", shell_quote(dir)));
    command
}

/// `ssh -p <port> user@host cat > '<dest>'`, fed the file on stdin
pub fn ssh_copy_command(remote: &RemoteHost, dest: &Path) -> Command {
    let mut command = Command::new("ssh");
    command
        .arg("-p")
        .arg(remote.port.to_string())
        .arg(remote.target())
        .arg(format!("cat > {}", shell_quote(dest)));
    command
}

/// Quote a path as one word for a POSIX shell
pub fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().to_string()];
    parts.extend(command.get_args().map(|arg| arg.to_string_lossy().to_string()));
    parts.join(" ")
}

fn run(mut command: Command, machine: &MachineSpec) -> Result<(), DistributionError> {
    let description = describe(&command);
    debug!("Running on '{}': {}", machine.name, description);
    let status = command.status().map_err(|source| DistributionError::Spawn {
        command: description.clone(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(DistributionError::CommandFailed {
            command: description,
            machine: machine.name.clone(),
            status: status.to_string(),
        })
    }
}

/// Deliver committed artifacts: each node config into its home directory,
/// and the genesis file into the base directory of every machine that hosts
/// nodes.
pub fn deliver_artifacts<D>(
    distributor: &D,
    cluster: &ProvisionedCluster,
    configs: &[(usize, PathBuf)],
    genesis: Option<&Path>,
) -> Result<(), DistributionError>
where
    D: Distributor + ?Sized,
{
    for (ordinal, path) in configs {
        let Some(node) = cluster.node(*ordinal) else {
            continue;
        };
        let machine = &cluster.machine_of(node).spec;
        distributor.ensure_directory(&node.home, machine)?;
        distributor.deliver(path, &node.home, machine)?;
        debug!("Delivered {} to '{}':{}", path.display(), machine.name, node.home.display());
    }

    if let Some(genesis) = genesis {
        for machine in cluster.machines().iter().filter(|m| !m.nodes.is_empty()) {
            distributor.ensure_directory(&machine.spec.base_dir, &machine.spec)?;
            distributor.deliver(genesis, &machine.spec.base_dir, &machine.spec)?;
        }
    }

    info!(
        "Delivered {} config(s){} to cluster machines",
        configs.len(),
        if genesis.is_some() { " and genesis" } else { "" }
    );
    Ok(())
}
