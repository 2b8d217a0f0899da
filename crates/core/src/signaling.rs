//! Seam over the signaling channel

use crate::types::{IceCandidate, SessionDescription};
use crate::Result;
use async_trait::async_trait;

/// Outbound half of the signaling channel
///
/// The inbound half is whatever feeds a [`SessionHandle`](crate::SessionHandle).
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Deliver the offer
    ///
    /// Returns the answer when the remote peer replies with it
    /// synchronously, or `None` when it will arrive by a separate call.
    async fn send_offer(&self, offer: &SessionDescription) -> Result<Option<SessionDescription>>;

    /// Deliver one local candidate, fire-and-forget
    async fn send_candidate(&self, candidate: &IceCandidate) -> Result<()>;

    /// Pull one candidate queued by the remote peer
    ///
    /// `None` means the remote queue is drained. It is never an error.
    async fn pull_candidate(&self) -> Result<Option<IceCandidate>>;
}
