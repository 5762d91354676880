use std::path::PathBuf;

use raven_http::HttpError;
use raven_staging::StagingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Could not reach the release service: {0}")]
    Transport(#[source] HttpError),

    #[error("Unexpected reply from the release service: {0}")]
    Malformed(#[source] HttpError),

    #[error("No update artifact is available")]
    NoArtifact,

    #[error("Download interrupted: expected {expected} bytes, received {received}")]
    PartialDownload { expected: u64, received: u64 },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {dir} for installed artifacts: {reason}")]
    Scan { dir: PathBuf, reason: String },

    #[error("Failed to stage the update: {0}")]
    Staging(#[from] StagingError),
}

impl UpdateError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdateError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<HttpError> for UpdateError {
    fn from(err: HttpError) -> Self {
        if err.is_malformed() {
            UpdateError::Malformed(err)
        } else {
            UpdateError::Transport(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
