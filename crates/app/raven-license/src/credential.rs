use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to read credential file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write credential file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove credential file {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Single-line file holding the raw license key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path, file_name: &str) -> Self {
        Self::new(dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key, trimmed. A missing file or blank first line is `None`.
    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        let contents =
            raven_fs::read_to_string_if_exists(&self.path).map_err(|e| CredentialError::Read {
                path: self.path.clone(),
                reason: format!("{e:#}"),
            })?;

        Ok(contents
            .as_deref()
            .and_then(|contents| contents.lines().next())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned))
    }

    /// Replace the stored key in one atomic step.
    pub fn store(&self, key: &str) -> Result<(), CredentialError> {
        let write_err = |source| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        raven_fs::create_dirs_then_write_private(&self.path, key).map_err(write_err)?;

        debug!(path = %self.path.display(), "license key saved");
        Ok(())
    }

    /// Remove the stored key. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        raven_fs::remove_file_if_exists(&self.path).map_err(|source| CredentialError::Remove {
            path: self.path.clone(),
            source,
        })
    }
}
