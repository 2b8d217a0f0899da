//! HTTP signaling error types

use thiserror::Error;

/// HTTP signaling error types
#[derive(Debug, Error)]
pub enum Error {
    /// Remote endpoint answered with a non-success status
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Payload that is not a valid description or candidate
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for HTTP signaling operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for peerlink_core::Error {
    fn from(e: Error) -> Self {
        let message = e.to_string();
        match e {
            Error::SerializationError(_) | Error::InvalidPayload(_) => {
                peerlink_core::Error::Decode(message)
            }
            Error::HttpError(ref inner) if inner.is_decode() => peerlink_core::Error::Decode(message),
            Error::InvalidConfig(_) => peerlink_core::Error::InvalidConfig(message),
            Error::RequestFailed(_)
            | Error::ConnectionError(_)
            | Error::HttpError(_)
            | Error::ServerError(_) => peerlink_core::Error::Transport(message),
        }
    }
}
