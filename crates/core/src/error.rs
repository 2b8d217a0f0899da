//! Error types for the signaling core

/// Result type alias using the core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating a session
///
/// Every variant carries a rendered message so the error can be answered to
/// an inbound requester and still be returned from the session loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Signaling delivery failed (connection refused, socket closed, bad status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed session description or candidate payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation not allowed in the current negotiation state
    #[error("Negotiation state violation: {0}")]
    Negotiation(String),

    /// The underlying peer connection rejected an operation
    #[error("Peer connection error: {0}")]
    PeerConnection(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An internal actor or reply channel went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

/// Coarse classification used for logging and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Negotiation,
    PeerConnection,
    Config,
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Negotiation(_) => ErrorKind::Negotiation,
            Error::PeerConnection(_) => ErrorKind::PeerConnection,
            Error::InvalidConfig(_) => ErrorKind::Config,
            Error::ChannelClosed(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error was caused by the remote peer's payload
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed("receiver dropped".to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::ChannelClosed("reply dropped".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Negotiation("remote description already set".to_string());
        assert_eq!(
            err.to_string(),
            "Negotiation state violation: remote description already set"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::Decode("x".into()).kind(), ErrorKind::Decode);
        assert_eq!(Error::Transport("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(Error::InvalidConfig("x".into()).kind(), ErrorKind::Config);
        assert_eq!(Error::ChannelClosed("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::from(io);
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
