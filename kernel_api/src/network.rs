//! Network collaborator

use thiserror::Error;

/// Network errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Minimal network surface exposed to commands
pub trait Network {
    /// Fetches the document at `url`
    fn fetch(&mut self, url: &str) -> Result<String, NetworkError>;

    /// Returns the round-trip latency to `host` in milliseconds
    fn ping(&mut self, host: &str) -> Result<u64, NetworkError>;
}
