use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid endpoint URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Transport { source, .. } if source.is_timeout())
    }

    /// Whether the remote answered but the body could not be understood.
    pub fn is_malformed(&self) -> bool {
        matches!(self, HttpError::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
