use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list staging directory {dir}: {reason}")]
    List { dir: PathBuf, reason: String },

    #[error("malformed rename marker {path}")]
    MalformedMarker { path: PathBuf },

    #[error("{path} is not inside the staging directory {dir}")]
    OutsideDirectory { path: PathBuf, dir: PathBuf },
}

impl StagingError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StagingError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StagingError>;
