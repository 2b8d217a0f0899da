//! Error types for the WebRTC adapter

/// Result type alias using WebRTC Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in WebRTC adapter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// WebRTC peer connection error
    #[error("Peer connection error: {0}")]
    PeerConnectionError(String),

    /// ICE candidate error
    #[error("ICE candidate error: {0}")]
    IceCandidateError(String),

    /// SDP negotiation error
    #[error("SDP negotiation error: {0}")]
    SdpError(String),

    /// Data channel error
    #[error("Data channel error: {0}")]
    DataChannelError(String),

    /// WebRTC library error
    #[error("WebRTC error: {0}")]
    WebRtcError(String),
}

impl From<Error> for peerlink_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidConfig(msg) => peerlink_core::Error::InvalidConfig(msg),
            other => peerlink_core::Error::PeerConnection(other.to_string()),
        }
    }
}
