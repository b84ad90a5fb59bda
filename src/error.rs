use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Target is not an absolute URL with a host
    #[error("invalid target url '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("invalid run config: {0}")]
    InvalidConfig(String),

    #[error("failed to initialize http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] reqwest::Error),
}
