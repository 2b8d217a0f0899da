//! HTTP signaling channel for peerlink sessions
//!
//! Each peer runs a [`SignalingServer`] for inbound messages and talks to
//! the other peer's server through an [`HttpSignalingClient`].
//!
//! # Endpoints
//!
//! - **POST /sdp**: JSON session description; the responder replies with its answer
//! - **POST /candidate**: one candidate, raw line or JSON depending on [`CandidateEncoding`]
//! - **POST /getcandidate**: poll delivery only; one JSON candidate or an empty body once drained
//! - **GET /health**: health check
//!
//! # Usage
//!
//! ```ignore
//! use peerlink_http::{HttpSignalingClient, HttpSignalingConfig, SignalingServer};
//!
//! let config = HttpSignalingConfig::default();
//! let client = Arc::new(HttpSignalingClient::new(&config)?);
//! let (session, handle) = Session::new(session_config, connection, client, events);
//!
//! let listener = SignalingServer::bind(&config.listen_address).await?;
//! tokio::spawn(SignalingServer::new(handle, config.candidate_encoding).serve(listener, shutdown.clone()));
//! session.run(shutdown).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod wire;

pub use client::HttpSignalingClient;
pub use config::HttpSignalingConfig;
pub use error::{Error, Result};
pub use server::SignalingServer;
pub use wire::CandidateEncoding;
