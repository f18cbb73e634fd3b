//! Keystore reading key files from a directory.
//!
//! Missing key material can be generated up front by invoking an external
//! key generation binary as `<binary> keygen --addr <dir>/<stem>`, which
//! writes `<stem>.{key,pub,id,addr}`.

use super::{Address, KeyNaming, Keystore, KeystoreError, PeerId};
use crate::config::KeystoreConfig;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct DirKeystore {
    dir: PathBuf,
    naming: KeyNaming,
}

impl DirKeystore {
    pub fn new(dir: impl Into<PathBuf>, naming: KeyNaming) -> Self {
        Self {
            dir: dir.into(),
            naming,
        }
    }

    pub fn from_config(config: &KeystoreConfig) -> Self {
        Self::new(&config.dir, KeyNaming::new(config.prefix.clone()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run the key generation binary for every ordinal in `0..count` that
    /// has no identity file yet. Returns the number of generated keys.
    pub fn ensure_keys(&self, count: usize, keygen: &Path) -> Result<usize, KeystoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| KeystoreError::Keygen {
            ordinal: 0,
            reason: format!("cannot create key directory {}: {}", self.dir.display(), e),
        })?;

        let mut generated = 0;
        for ordinal in 0..count {
            let id_path = self.dir.join(self.naming.id_file(ordinal));
            if id_path.exists() {
                continue;
            }

            let stem = self.dir.join(self.naming.stem(ordinal));
            debug!("Generating key material at {}", stem.display());
            let status = Command::new(keygen)
                .arg("keygen")
                .arg("--addr")
                .arg(&stem)
                .status()
                .map_err(|e| KeystoreError::Keygen {
                    ordinal,
                    reason: format!("cannot run {}: {}", keygen.display(), e),
                })?;

            if !status.success() {
                return Err(KeystoreError::Keygen {
                    ordinal,
                    reason: format!("{} exited with {}", keygen.display(), status),
                });
            }
            if !id_path.exists() {
                return Err(KeystoreError::Keygen {
                    ordinal,
                    reason: format!("{} produced no {}", keygen.display(), id_path.display()),
                });
            }
            generated += 1;
        }

        if generated > 0 {
            info!("Generated key material for {} node(s) in {}", generated, self.dir.display());
        }
        Ok(generated)
    }

    fn read_value(&self, file_name: &str) -> Result<String, String> {
        let path = self.dir.join(file_name);
        let content =
            fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let value = content.trim();
        if value.is_empty() {
            return Err(format!("{} is empty", path.display()));
        }
        Ok(value.to_string())
    }
}

impl Keystore for DirKeystore {
    fn identity(&self, ordinal: usize) -> Result<PeerId, KeystoreError> {
        self.read_value(&self.naming.id_file(ordinal))
            .map(PeerId)
            .map_err(|reason| KeystoreError::MissingKeyMaterial { ordinal, reason })
    }

    fn address(&self, ordinal: usize) -> Result<Address, KeystoreError> {
        self.read_value(&self.naming.addr_file(ordinal))
            .map(Address)
            .map_err(|reason| KeystoreError::MissingAddress { ordinal, reason })
    }

    fn key_file_name(&self, ordinal: usize) -> String {
        self.naming.key_file(ordinal)
    }
}
