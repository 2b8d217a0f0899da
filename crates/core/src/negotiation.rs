//! Session negotiation state machine
//!
//! Pure and synchronous: it never touches the connection or the network.
//! The session loop asks it whether an operation is allowed, performs the
//! operation, then records the outcome here.
//!
//! ```text
//! Idle → LocalDescriptionSet → RemoteDescriptionPending → RemoteDescriptionSet → CandidateExchange → Converged
//! ```
//!
//! The responder skips the two local states: it goes from `Idle` straight
//! to `RemoteDescriptionSet` when the offer arrives, and enters
//! `CandidateExchange` once its answer is applied.

use crate::config::CandidateDelivery;
use crate::types::{PeerRole, SdpType, SessionDescription};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Negotiation progress of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Idle,
    LocalDescriptionSet,
    RemoteDescriptionPending,
    RemoteDescriptionSet,
    CandidateExchange,
    Converged,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::LocalDescriptionSet => "local-description-set",
            NegotiationState::RemoteDescriptionPending => "remote-description-pending",
            NegotiationState::RemoteDescriptionSet => "remote-description-set",
            NegotiationState::CandidateExchange => "candidate-exchange",
            NegotiationState::Converged => "converged",
        };
        f.write_str(s)
    }
}

/// Where a newly discovered local candidate goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateRoute {
    /// Remote description unknown: hold it in the candidate buffer
    Buffer,
    /// Send it to the remote peer now
    Forward,
    /// Queue it for the remote peer to pull
    HoldForPull,
}

/// What to do with a candidate received from the remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCandidateRoute {
    /// Add it to the connection now
    Apply,
    /// The answer is in flight: keep it until the answer is applied
    Defer,
    /// No remote description and none expected yet
    Reject,
}

/// Offer/answer state machine for one role
#[derive(Debug, Clone)]
pub struct Negotiation {
    role: PeerRole,
    delivery: CandidateDelivery,
    state: NegotiationState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
}

impl Negotiation {
    pub fn new(role: PeerRole, delivery: CandidateDelivery) -> Self {
        Self {
            role,
            delivery,
            state: NegotiationState::Idle,
            local: None,
            remote: None,
        }
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    /// Whether the remote description has been applied
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Record the local description
    ///
    /// Initiator: `Idle → LocalDescriptionSet`, offer only.
    /// Responder: `RemoteDescriptionSet → CandidateExchange`, answer only.
    pub fn set_local(&mut self, desc: SessionDescription) -> Result<()> {
        if self.local.is_some() {
            return Err(Error::Negotiation(
                "local description already set".to_string(),
            ));
        }
        self.expect_type(&desc, self.role.local_sdp_type(), "local")?;

        let next = match self.role {
            PeerRole::Initiator => {
                self.expect_state(NegotiationState::Idle, "set local offer")?;
                NegotiationState::LocalDescriptionSet
            }
            PeerRole::Responder => {
                self.expect_state(NegotiationState::RemoteDescriptionSet, "set local answer")?;
                NegotiationState::CandidateExchange
            }
        };

        self.local = Some(desc);
        self.transition(next);
        Ok(())
    }

    /// Record that the offer has been handed to the signaling channel
    pub fn offer_sent(&mut self) -> Result<()> {
        if self.role != PeerRole::Initiator {
            return Err(Error::Negotiation(
                "only the initiator sends an offer".to_string(),
            ));
        }
        self.expect_state(NegotiationState::LocalDescriptionSet, "send offer")?;
        self.transition(NegotiationState::RemoteDescriptionPending);
        Ok(())
    }

    /// Check that `desc` may be applied as the remote description
    ///
    /// Does not change anything, so the caller can reject a payload before
    /// touching the connection.
    pub fn validate_remote(&self, desc: &SessionDescription) -> Result<()> {
        if self.remote.is_some() {
            return Err(Error::Negotiation(
                "remote description already set".to_string(),
            ));
        }
        self.expect_type(desc, self.role.remote_sdp_type(), "remote")?;

        match self.role {
            PeerRole::Initiator => {
                self.expect_state(NegotiationState::RemoteDescriptionPending, "apply answer")
            }
            PeerRole::Responder => self.expect_state(NegotiationState::Idle, "apply offer"),
        }
    }

    /// Record the remote description
    ///
    /// Initiator: `RemoteDescriptionPending → RemoteDescriptionSet`.
    /// Responder: `Idle → RemoteDescriptionSet`.
    /// On error the state is left as it was.
    pub fn set_remote(&mut self, desc: SessionDescription) -> Result<()> {
        self.validate_remote(&desc)?;
        self.remote = Some(desc);
        self.transition(NegotiationState::RemoteDescriptionSet);
        Ok(())
    }

    /// Initiator: `RemoteDescriptionSet → CandidateExchange`
    pub fn begin_candidate_exchange(&mut self) -> Result<()> {
        self.expect_state(NegotiationState::RemoteDescriptionSet, "begin candidate exchange")?;
        self.transition(NegotiationState::CandidateExchange);
        Ok(())
    }

    /// `CandidateExchange → Converged`
    ///
    /// Returns false when the session was not exchanging candidates.
    pub fn converge(&mut self) -> bool {
        if self.state != NegotiationState::CandidateExchange {
            return false;
        }
        self.transition(NegotiationState::Converged);
        true
    }

    /// Route a newly discovered local candidate
    pub fn route_local_candidate(&self) -> CandidateRoute {
        if self.role == PeerRole::Responder && self.delivery == CandidateDelivery::Poll {
            return CandidateRoute::HoldForPull;
        }

        if self.has_remote() {
            CandidateRoute::Forward
        } else {
            CandidateRoute::Buffer
        }
    }

    /// Route a candidate received from the remote peer
    pub fn route_remote_candidate(&self) -> RemoteCandidateRoute {
        if self.has_remote() {
            RemoteCandidateRoute::Apply
        } else if self.role == PeerRole::Initiator
            && self.state == NegotiationState::RemoteDescriptionPending
        {
            RemoteCandidateRoute::Defer
        } else {
            RemoteCandidateRoute::Reject
        }
    }

    fn expect_state(&self, expected: NegotiationState, op: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::Negotiation(format!(
                "cannot {} as {} in state {} (expected {})",
                op, self.role, self.state, expected
            )))
        }
    }

    fn expect_type(&self, desc: &SessionDescription, expected: SdpType, which: &str) -> Result<()> {
        if desc.sdp_type == expected {
            Ok(())
        } else {
            Err(Error::Negotiation(format!(
                "{} expects a {} {} description, got {}",
                self.role, which, expected, desc.sdp_type
            )))
        }
    }

    fn transition(&mut self, next: NegotiationState) {
        debug!(role = %self.role, from = %self.state, to = %next, "Negotiation state changed");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initiator() -> Negotiation {
        Negotiation::new(PeerRole::Initiator, CandidateDelivery::Push)
    }

    fn responder() -> Negotiation {
        Negotiation::new(PeerRole::Responder, CandidateDelivery::Push)
    }

    #[test]
    fn test_initiator_full_path() {
        let mut n = initiator();
        assert_eq!(n.route_local_candidate(), CandidateRoute::Buffer);

        n.set_local(SessionDescription::offer("o")).unwrap();
        assert_eq!(n.state(), NegotiationState::LocalDescriptionSet);
        n.offer_sent().unwrap();
        assert_eq!(n.state(), NegotiationState::RemoteDescriptionPending);
        assert_eq!(n.route_local_candidate(), CandidateRoute::Buffer);
        assert_eq!(n.route_remote_candidate(), RemoteCandidateRoute::Defer);

        n.set_remote(SessionDescription::answer("a")).unwrap();
        assert_eq!(n.state(), NegotiationState::RemoteDescriptionSet);
        assert_eq!(n.route_local_candidate(), CandidateRoute::Forward);
        assert_eq!(n.route_remote_candidate(), RemoteCandidateRoute::Apply);

        n.begin_candidate_exchange().unwrap();
        assert!(n.converge());
        assert_eq!(n.state(), NegotiationState::Converged);
        assert!(!n.converge());
    }

    #[test]
    fn test_responder_full_path() {
        let mut n = responder();
        assert_eq!(n.route_remote_candidate(), RemoteCandidateRoute::Reject);

        n.set_remote(SessionDescription::offer("o")).unwrap();
        assert_eq!(n.state(), NegotiationState::RemoteDescriptionSet);
        assert_eq!(n.route_local_candidate(), CandidateRoute::Forward);

        n.set_local(SessionDescription::answer("a")).unwrap();
        assert_eq!(n.state(), NegotiationState::CandidateExchange);
        assert!(n.converge());
    }

    #[test]
    fn test_remote_description_twice_is_violation() {
        let mut n = responder();
        n.set_remote(SessionDescription::offer("o")).unwrap();

        let err = n.set_remote(SessionDescription::offer("o2")).unwrap_err();
        assert!(matches!(err, Error::Negotiation(_)));
        assert_eq!(n.state(), NegotiationState::RemoteDescriptionSet);
        assert_eq!(n.remote_description().unwrap().sdp, "o");
    }

    #[test]
    fn test_wrong_remote_type_leaves_state() {
        let mut n = responder();
        assert!(n.set_remote(SessionDescription::answer("a")).is_err());
        assert_eq!(n.state(), NegotiationState::Idle);
        assert!(!n.has_remote());

        let mut n = initiator();
        n.set_local(SessionDescription::offer("o")).unwrap();
        n.offer_sent().unwrap();
        assert!(n.set_remote(SessionDescription::offer("o")).is_err());
        assert_eq!(n.state(), NegotiationState::RemoteDescriptionPending);
    }

    #[test]
    fn test_initiator_answer_before_offer_rejected() {
        let mut n = initiator();
        assert!(n.validate_remote(&SessionDescription::answer("a")).is_err());
        assert_eq!(n.state(), NegotiationState::Idle);
    }

    #[test]
    fn test_local_type_checked() {
        let mut n = initiator();
        assert!(n.set_local(SessionDescription::answer("a")).is_err());
        assert_eq!(n.state(), NegotiationState::Idle);

        let mut n = responder();
        assert!(n.set_local(SessionDescription::answer("a")).is_err());
        assert_eq!(n.state(), NegotiationState::Idle);
    }

    #[test]
    fn test_responder_cannot_send_offer() {
        let mut n = responder();
        assert!(n.offer_sent().is_err());
    }

    #[test]
    fn test_poll_responder_holds_every_candidate() {
        let mut n = Negotiation::new(PeerRole::Responder, CandidateDelivery::Poll);
        assert_eq!(n.route_local_candidate(), CandidateRoute::HoldForPull);
        n.set_remote(SessionDescription::offer("o")).unwrap();
        assert_eq!(n.route_local_candidate(), CandidateRoute::HoldForPull);
    }

    #[test]
    fn test_poll_initiator_pushes_after_answer() {
        let mut n = Negotiation::new(PeerRole::Initiator, CandidateDelivery::Poll);
        assert_eq!(n.route_local_candidate(), CandidateRoute::Buffer);
        n.set_local(SessionDescription::offer("o")).unwrap();
        n.offer_sent().unwrap();
        n.set_remote(SessionDescription::answer("a")).unwrap();
        assert_eq!(n.route_local_candidate(), CandidateRoute::Forward);
    }
}
