//! Messages flowing into the session loop

use crate::negotiation::NegotiationState;
use crate::types::{ConnectionState, IceCandidate, SessionDescription};
use crate::Result;
use serde::Serialize;
use tokio::sync::oneshot;

/// Notification pushed by the peer connection
///
/// Connection callbacks only forward these; every reaction happens in the
/// session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A local candidate was discovered
    LocalCandidate(IceCandidate),
    /// Candidate gathering finished
    GatheringComplete,
    StateChanged(ConnectionState),
    DataChannelOpen { label: String },
    DataChannelMessage { label: String, text: String },
}

/// Request from a signaling handler or the heartbeat task
#[derive(Debug)]
pub enum SessionCommand {
    /// Remote description received; replies with the local answer if one
    /// is owed to the requester
    RemoteDescription {
        desc: SessionDescription,
        reply: oneshot::Sender<Result<Option<SessionDescription>>>,
    },
    RemoteCandidate {
        candidate: IceCandidate,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Pop one queued local candidate for the remote peer
    PullCandidate {
        reply: oneshot::Sender<Result<Option<IceCandidate>>>,
    },
    SendText {
        text: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// A malformed inbound payload was rejected at the transport edge
    Fault { error: crate::Error },
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: NegotiationState,
    pub connection: Option<ConnectionState>,
    /// Candidates waiting for the remote description or a pull
    pub buffered: usize,
    /// Pull requests issued by this side
    pub polls: usize,
    /// Candidates received through pulls
    pub pulled: usize,
    /// Whether the pull loop has seen the empty signal
    pub pull_finished: bool,
}

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The lifecycle monitor asked to terminate
    ConnectionFailed,
    /// The shutdown signal fired
    Shutdown,
}
