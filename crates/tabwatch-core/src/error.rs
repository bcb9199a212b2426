use thiserror::Error;

/// Failure talking to the time-tracking server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{api} API error ({status}): {body}")]
    Http {
        api: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid server URL '{0}'")]
    InvalidUrl(String),
}

/// Rejected control message
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Failed(String),
}

impl ControlError {
    /// Stable machine-readable kind for the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "unknownOperation",
            Self::InvalidRequest(_) => "invalidRequest",
            Self::Failed(_) => "failed",
        }
    }
}

/// Native-messaging framing failure
#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("message of {0} bytes exceeds the native messaging limit")]
    TooLarge(usize),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}
