//! Seam over the underlying peer connection

use crate::types::{IceCandidate, SessionDescription};
use crate::Result;
use async_trait::async_trait;

/// Operations the session loop performs on the underlying connection
///
/// Candidate gathering, the encryption handshake and everything else inside
/// the connection are the implementation's business. Its notifications come
/// back as [`PeerEvent`](crate::PeerEvent)s on a channel handed to the
/// session separately.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Apply the local description; starts candidate gathering
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Send a text message over the open data channel
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Release the connection
    async fn close(&self) -> Result<()>;
}
