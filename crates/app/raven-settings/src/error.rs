use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read settings from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings")]
    Parse(#[from] serde_json::Error),

    #[error("failed to parse settings file")]
    ParseLenient(#[from] serde_json_lenient::Error),

    #[error("no platform config directory available")]
    NoConfigDir,

    #[error("invalid settings: {0}")]
    Invalid(String),
}
