use raven_http::HttpError;
use thiserror::Error;

/// Why the gate refused a key. The `Display` text is what the license prompt
/// shows verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("Please enter a license key")]
    EmptyKey,

    #[error("{0}")]
    ServerRejected(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    MalformedResponse(String),

    #[error("Validation superseded by a newer attempt")]
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    EmptyKey,
    ServerRejected,
    Transport,
    MalformedResponse,
    Superseded,
}

impl LicenseError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            LicenseError::EmptyKey => RejectionKind::EmptyKey,
            LicenseError::ServerRejected(_) => RejectionKind::ServerRejected,
            LicenseError::Transport(_) => RejectionKind::Transport,
            LicenseError::MalformedResponse(_) => RejectionKind::MalformedResponse,
            LicenseError::Superseded => RejectionKind::Superseded,
        }
    }
}

impl From<HttpError> for LicenseError {
    fn from(err: HttpError) -> Self {
        if err.is_malformed() {
            LicenseError::MalformedResponse(err.to_string())
        } else {
            LicenseError::Transport(err.to_string())
        }
    }
}
