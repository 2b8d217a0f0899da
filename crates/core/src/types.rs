//! Data model shared by every crate in the workspace

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the exchange this process plays
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    /// Creates the offer
    Initiator,
    /// Answers the offer
    Responder,
}

impl PeerRole {
    /// SDP type this role creates locally
    pub fn local_sdp_type(&self) -> SdpType {
        match self {
            PeerRole::Initiator => SdpType::Offer,
            PeerRole::Responder => SdpType::Answer,
        }
    }

    /// SDP type this role expects from the remote peer
    pub fn remote_sdp_type(&self) -> SdpType {
        match self {
            PeerRole::Initiator => SdpType::Answer,
            PeerRole::Responder => SdpType::Offer,
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::Initiator => write!(f, "initiator"),
            PeerRole::Responder => write!(f, "responder"),
        }
    }
}

/// Role tag of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Answer => write!(f, "answer"),
        }
    }
}

/// Negotiated session parameters
///
/// Serialized as `{"type": "offer", "sdp": "v=0..."}`, the shape used by
/// webrtc-rs and browser implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One discovered network path
///
/// The `candidate` line is the identity of the path; the remaining fields are
/// media-section hints that only travel with the JSON wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,

    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    /// Candidate with only the candidate line set
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            ..Default::default()
        }
    }

    /// Connection address of the candidate line, if it can be read
    ///
    /// `candidate:<foundation> <component> <transport> <priority> <address> <port> typ <type>`
    pub fn address(&self) -> Option<&str> {
        self.candidate
            .trim_start_matches("candidate:")
            .split_whitespace()
            .nth(4)
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.candidate)
    }
}

/// State of the underlying connection, as reported by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_CANDIDATE: &str = "candidate:1966762133 1 udp 2130706431 192.168.1.20 51234 typ host";

    #[test]
    fn test_description_wire_shape() {
        let desc = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0\r\n");
    }

    #[test]
    fn test_description_round_trip() {
        let desc = SessionDescription::answer("v=0\r\no=- 1 2 IN IP4 0.0.0.0\r\n");
        let json = serde_json::to_string(&desc).unwrap();
        let back: SessionDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_description_rejects_unknown_type() {
        let result = serde_json::from_str::<SessionDescription>(r#"{"type":"pranswer","sdp":""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_candidate_round_trip_with_hints() {
        let candidate = IceCandidate {
            candidate: HOST_CANDIDATE.to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: Some("abcd".to_string()),
        };
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["sdpMid"], "0");
        assert_eq!(json["sdpMLineIndex"], 0);
        assert_eq!(json["usernameFragment"], "abcd");

        let back: IceCandidate = serde_json::from_value(json).unwrap();
        assert_eq!(back, candidate);
    }

    #[test]
    fn test_candidate_minimal_json() {
        let back: IceCandidate =
            serde_json::from_str(&format!(r#"{{"candidate":"{}"}}"#, HOST_CANDIDATE)).unwrap();
        assert_eq!(back, IceCandidate::new(HOST_CANDIDATE));
    }

    #[test]
    fn test_candidate_address() {
        assert_eq!(IceCandidate::new(HOST_CANDIDATE).address(), Some("192.168.1.20"));
        assert_eq!(IceCandidate::new("garbage").address(), None);
    }

    #[test]
    fn test_role_sdp_types() {
        assert_eq!(PeerRole::Initiator.local_sdp_type(), SdpType::Offer);
        assert_eq!(PeerRole::Initiator.remote_sdp_type(), SdpType::Answer);
        assert_eq!(PeerRole::Responder.local_sdp_type(), SdpType::Answer);
        assert_eq!(PeerRole::Responder.remote_sdp_type(), SdpType::Offer);
    }
}
