//! webrtc-rs peer connection behind the session seam
//!
//! Every webrtc-rs callback only forwards a [`PeerEvent`] into the channel
//! returned by [`WebRtcPeerConnection::new`]. The session loop owns all
//! reactions to them.

use crate::config::IceConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use peerlink_core::{
    ConnectionState, IceCandidate, PeerEvent, PeerRole, SdpType, SessionDescription,
};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, instrument, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

/// Label of the data channel the initiator opens
pub const DATA_CHANNEL_LABEL: &str = "data";

type ChannelSlot = Arc<RwLock<Option<Arc<RTCDataChannel>>>>;

/// Peer connection adapter
///
/// The initiator creates the `data` channel before its offer so the SDP
/// carries an application section. The responder adopts whatever channel
/// the remote side announces.
pub struct WebRtcPeerConnection {
    peer_connection: Arc<RTCPeerConnection>,

    /// Set once the data channel reports open
    data_channel: ChannelSlot,
}

impl WebRtcPeerConnection {
    /// Create a peer connection and the event channel it reports on
    #[instrument(skip(ice), fields(role = %role))]
    pub async fn new(
        role: PeerRole,
        ice: &IceConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<PeerEvent>)> {
        ice.validate()?;

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::WebRtcError(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine).map_err(|e| {
                Error::WebRtcError(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers(ice),
            ..Default::default()
        };

        let peer_connection =
            Arc::new(api.new_peer_connection(rtc_config).await.map_err(|e| {
                Error::WebRtcError(format!("Failed to create peer connection: {}", e))
            })?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let data_channel: ChannelSlot = Arc::new(RwLock::new(None));

        let tx = events_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = tx.clone();
            Box::pin(async move {
                let event = match c {
                    Some(c) => match c.to_json() {
                        Ok(init) => PeerEvent::LocalCandidate(from_rtc_candidate(init)),
                        Err(e) => {
                            warn!("Failed to serialize local candidate: {}", e);
                            return;
                        }
                    },
                    None => PeerEvent::GatheringComplete,
                };
                let _ = tx.send(event);
            })
        }));

        let tx = events_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = tx.clone();
                Box::pin(async move {
                    if let Some(state) = map_state(s) {
                        let _ = tx.send(PeerEvent::StateChanged(state));
                    }
                })
            },
        ));

        match role {
            PeerRole::Initiator => {
                let channel = peer_connection
                    .create_data_channel(
                        DATA_CHANNEL_LABEL,
                        Some(RTCDataChannelInit {
                            ordered: Some(true),
                            ..Default::default()
                        }),
                    )
                    .await
                    .map_err(|e| {
                        Error::DataChannelError(format!("Failed to create data channel: {}", e))
                    })?;
                wire_data_channel(&channel, events_tx, Arc::clone(&data_channel));
            }
            PeerRole::Responder => {
                let slot = Arc::clone(&data_channel);
                peer_connection.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
                    debug!("Remote opened data channel '{}'", channel.label());
                    wire_data_channel(&channel, events_tx.clone(), Arc::clone(&slot));
                    Box::pin(async {})
                }));
            }
        }

        info!("Created peer connection");

        Ok((
            Arc::new(Self {
                peer_connection,
                data_channel,
            }),
            events_rx,
        ))
    }
}

fn ice_servers(ice: &IceConfig) -> Vec<RTCIceServer> {
    ice.stun_servers
        .iter()
        .map(|url| RTCIceServer {
            urls: vec![url.clone()],
            ..Default::default()
        })
        .chain(ice.turn_servers.iter().map(|turn| RTCIceServer {
            urls: vec![turn.url.clone()],
            username: turn.username.clone(),
            credential: turn.credential.clone(),
            ..Default::default()
        }))
        .collect()
}

/// Forward open and text message notifications of `channel`
fn wire_data_channel(
    channel: &Arc<RTCDataChannel>,
    events: mpsc::UnboundedSender<PeerEvent>,
    slot: ChannelSlot,
) {
    let label = channel.label().to_string();

    // Weak so the handler does not keep its own channel alive
    let weak: Weak<RTCDataChannel> = Arc::downgrade(channel);
    let tx = events.clone();
    let open_label = label.clone();
    channel.on_open(Box::new(move || {
        Box::pin(async move {
            if let Some(channel) = weak.upgrade() {
                *slot.write().await = Some(channel);
            }
            let _ = tx.send(PeerEvent::DataChannelOpen { label: open_label });
        })
    }));

    channel.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = events.clone();
        let label = label.clone();
        Box::pin(async move {
            if !msg.is_string {
                debug!("Ignoring {} byte binary message on '{}'", msg.data.len(), label);
                return;
            }
            let text = String::from_utf8_lossy(&msg.data).into_owned();
            let _ = tx.send(PeerEvent::DataChannelMessage { label, text });
        })
    }));
}

/// Map webrtc-rs connection states; `Unspecified` has no counterpart
pub(crate) fn map_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    parsed.map_err(|e| Error::SdpError(format!("Failed to parse {}: {}", desc.sdp_type, e)))
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => Err(Error::SdpError(format!(
            "Unsupported description type: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl peerlink_core::PeerConnection for WebRtcPeerConnection {
    async fn create_offer(&self) -> peerlink_core::Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to create offer: {}", e)))?;
        Ok(from_rtc_description(offer)?)
    }

    async fn create_answer(&self) -> peerlink_core::Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to create answer: {}", e)))?;
        Ok(from_rtc_description(answer)?)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> peerlink_core::Result<()> {
        debug!("Setting local {}", desc.sdp_type);
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set local description: {}", e)))?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> peerlink_core::Result<()> {
        debug!("Setting remote {}", desc.sdp_type);
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .map_err(|e| Error::SdpError(format!("Failed to set remote description: {}", e)))?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> peerlink_core::Result<()> {
        debug!("Adding remote candidate {}", candidate);
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .map_err(|e| Error::IceCandidateError(format!("Failed to add ICE candidate: {}", e)))?;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> peerlink_core::Result<()> {
        let channel = self
            .data_channel
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::DataChannelError("Data channel is not open".to_string()))?;

        channel
            .send_text(text.to_string())
            .await
            .map_err(|e| Error::DataChannelError(format!("Failed to send text: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> peerlink_core::Result<()> {
        info!("Closing peer connection");
        self.data_channel.write().await.take();
        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::PeerConnectionError(format!("Failed to close: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_core::PeerConnection;
    use std::time::Duration;

    fn offline() -> IceConfig {
        IceConfig {
            stun_servers: Vec::new(),
            turn_servers: Vec::new(),
        }
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(
            map_state(RTCPeerConnectionState::Failed),
            Some(ConnectionState::Failed)
        );
        assert_eq!(
            map_state(RTCPeerConnectionState::Disconnected),
            Some(ConnectionState::Disconnected)
        );
        assert_eq!(map_state(RTCPeerConnectionState::Unspecified), None);
    }

    #[test]
    fn test_candidate_conversion_keeps_hints() {
        let candidate = IceCandidate {
            candidate: "candidate:1 1 udp 2130706431 10.0.0.2 5000 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };
        let back = from_rtc_candidate(to_rtc_candidate(candidate.clone()));
        assert_eq!(back, candidate);
    }

    #[tokio::test]
    async fn test_invalid_ice_config_is_rejected() {
        let ice = IceConfig {
            stun_servers: vec!["stun.example.com".to_string()],
            turn_servers: Vec::new(),
        };
        let result = WebRtcPeerConnection::new(PeerRole::Initiator, &ice).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_initiator_offer_carries_data_channel() {
        let (pc, _events) = WebRtcPeerConnection::new(PeerRole::Initiator, &offline())
            .await
            .unwrap();

        let offer = pc.create_offer().await.unwrap();
        assert_eq!(offer.sdp_type, SdpType::Offer);
        assert!(offer.sdp.contains("m=application"));

        pc.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_text_before_open_fails() {
        let (pc, _events) = WebRtcPeerConnection::new(PeerRole::Responder, &offline())
            .await
            .unwrap();

        let err = pc.send_text("hello").await.unwrap_err();
        assert_eq!(err.kind(), peerlink_core::ErrorKind::PeerConnection);
    }

    #[tokio::test]
    async fn test_offer_answer_exchange_starts_gathering() {
        let (initiator, mut initiator_events) =
            WebRtcPeerConnection::new(PeerRole::Initiator, &offline())
                .await
                .unwrap();
        let (responder, _responder_events) =
            WebRtcPeerConnection::new(PeerRole::Responder, &offline())
                .await
                .unwrap();

        let offer = initiator.create_offer().await.unwrap();
        initiator.set_local_description(offer.clone()).await.unwrap();

        responder.set_remote_description(offer).await.unwrap();
        let answer = responder.create_answer().await.unwrap();
        assert_eq!(answer.sdp_type, SdpType::Answer);
        responder.set_local_description(answer.clone()).await.unwrap();

        initiator.set_remote_description(answer).await.unwrap();

        // Either a host candidate or the end of gathering, depending on interfaces
        let event = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match initiator_events.recv().await {
                    Some(e @ PeerEvent::LocalCandidate(_)) | Some(e @ PeerEvent::GatheringComplete) => {
                        break Some(e)
                    }
                    Some(_) => continue,
                    None => break None,
                }
            }
        })
        .await
        .unwrap();
        assert!(event.is_some());

        initiator.close().await.unwrap();
        responder.close().await.unwrap();
    }
}
