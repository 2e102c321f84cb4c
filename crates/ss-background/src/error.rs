//! Error taxonomy for the background coordinator.

/// Background error.
///
/// Carries rendered messages rather than source errors so results can be
/// shared between coalesced waiters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Backend unreachable: {0}")]
    Transport(String),
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed backend response: {0}")]
    Decode(String),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Tab operation failed: {0}")]
    Tabs(String),
    #[error("Invalid keyword list: {0}")]
    Keywords(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<ss_core::KeywordError> for Error {
    fn from(err: ss_core::KeywordError) -> Self {
        Self::Keywords(err.to_string())
    }
}
