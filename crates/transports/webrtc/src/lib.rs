//! webrtc-rs adapter for peerlink sessions
//!
//! Implements [`peerlink_core::PeerConnection`] on top of a webrtc-rs
//! `RTCPeerConnection` with a single text data channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  peerlink_core::Session                  │
//! │  ↑ PeerEvent (candidates, state, text)   │
//! │  │                  ↓ PeerConnection ops │
//! │  WebRtcPeerConnection                    │
//! │  ├─ RTCPeerConnection (ICE/DTLS/SCTP)    │
//! │  └─ RTCDataChannel "data"                │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use peerlink_webrtc::{parse_turn_server, IceConfig};
//!
//! let mut ice = IceConfig::default();
//! ice.turn_servers
//!     .push(parse_turn_server("turn:turn.example.com:3478:alice:secret").unwrap());
//!
//! assert!(ice.validate().is_ok());
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod error;

pub use config::{parse_turn_server, IceConfig, TurnServerConfig};
pub use connection::{WebRtcPeerConnection, DATA_CHANNEL_LABEL};
pub use error::{Error, Result};
