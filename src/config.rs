//! Registry persistence (load/save).

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::{InvalidRegistry, Registry};

/// Reads and writes the deployments registry file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this store is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry. A missing file is an empty registry.
    pub fn load(&self) -> Result<Registry, StoreError> {
        debug!("Reading registry: {}", self.path.display());
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Registry file does not exist yet");
                return Ok(Registry::new());
            }
            Err(source) => {
                return Err(StoreError::ReadFailed {
                    source,
                    path: self.path.clone(),
                })
            }
        };

        let registry: Registry =
            serde_json::from_str(&content).map_err(|source| StoreError::ParseFailed {
                source,
                path: self.path.clone(),
            })?;
        registry.check().map_err(|source| StoreError::Invalid {
            source,
            path: self.path.clone(),
        })?;

        debug!("Registry has {} deployments", registry.len());
        Ok(registry)
    }

    /// Overwrite the registry file with `registry`.
    /// Writes a sibling temp file and renames it into place, so a failure never
    /// leaves a partially written registry behind.
    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let mut output =
            serde_json::to_string_pretty(registry).map_err(StoreError::SerializeFailed)?;
        output.push('\n');

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            source,
            path: dir.clone(),
        })?;

        let write_failed = |source| StoreError::WriteFailed {
            source,
            path: self.path.clone(),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        temp.write_all(output.as_bytes()).map_err(write_failed)?;
        temp.as_file().sync_all().map_err(write_failed)?;
        temp.persist(&self.path).map_err(|e| write_failed(e.error))?;

        debug!(
            "Wrote {} deployments to {}",
            registry.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed { source: std::io::Error, path: PathBuf },
    #[error("Failed to parse {}: {source}", path.display())]
    ParseFailed { source: serde_json::Error, path: PathBuf },
    #[error("Invalid registry {}: {source}", path.display())]
    Invalid {
        source: InvalidRegistry,
        path: PathBuf,
    },
    #[error("Failed to serialize registry: {0}")]
    SerializeFailed(#[source] serde_json::Error),
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir { source: std::io::Error, path: PathBuf },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed { source: std::io::Error, path: PathBuf },
}
