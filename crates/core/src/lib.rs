//! Signaling core for two-peer WebRTC sessions
//!
//! This crate holds everything about connection setup that does not depend
//! on a network stack: the offer/answer state machine, the buffer that holds
//! local candidates until the remote description is known, the connection
//! lifecycle monitor and the session loop that ties them together.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Signaling handlers (HTTP)        PeerConnection callbacks   │
//! │        │ SessionHandle                  │ PeerEvent          │
//! │        ▼                                ▼                    │
//! │  Session loop ── Negotiation, CandidateBuffer, Monitor       │
//! │        │ Outbound                                            │
//! │        ▼                                                     │
//! │  Outbox task ── SignalingChannel (send_offer, candidates)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The peer connection and the signaling channel are traits; the
//! `peerlink-webrtc` and `peerlink-http` crates implement them.
//!
//! # Example
//!
//! ```
//! use peerlink_core::{CandidateDelivery, PeerRole, SessionConfig};
//!
//! let config = SessionConfig::new(PeerRole::Responder).with_delivery(CandidateDelivery::Poll);
//! assert!(config.validate().is_ok());
//! ```

pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod lifecycle;
pub mod negotiation;
pub mod session;
pub mod shutdown;
pub mod signaling;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buffer::CandidateBuffer;
pub use config::{CandidateDelivery, FailurePolicy, HeartbeatConfig, SessionConfig};
pub use connection::PeerConnection;
pub use error::{Error, ErrorKind, Result};
pub use events::{PeerEvent, SessionCommand, SessionExit, SessionSnapshot};
pub use lifecycle::{LifecycleMonitor, MonitorVerdict};
pub use negotiation::{CandidateRoute, Negotiation, NegotiationState, RemoteCandidateRoute};
pub use session::{Session, SessionHandle};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use signaling::SignalingChannel;
pub use types::{ConnectionState, IceCandidate, PeerRole, SdpType, SessionDescription};
