//! Scripted test doubles for the connection and signaling seams
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates.

use crate::connection::PeerConnection;
use crate::events::PeerEvent;
use crate::signaling::SignalingChannel;
use crate::types::{IceCandidate, SessionDescription};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Build a host candidate line with a recognizable foundation
pub fn host_candidate(n: u32) -> IceCandidate {
    IceCandidate::new(format!(
        "candidate:{} 1 udp 2130706431 192.168.1.{} {} typ host",
        n,
        n % 250 + 1,
        50000 + n
    ))
}

/// Poll `check` every few milliseconds until it returns true or `timeout`
/// elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[derive(Debug, Default)]
struct ConnectionLog {
    local: Vec<SessionDescription>,
    remote: Vec<SessionDescription>,
    candidates: Vec<IceCandidate>,
    texts: Vec<String>,
    closed: bool,
}

/// In-memory peer connection
///
/// Records every operation and lets the test push [`PeerEvent`]s as if the
/// connection had raised them.
pub struct MockConnection {
    events: mpsc::UnboundedSender<PeerEvent>,
    log: Mutex<ConnectionLog>,
    channel_open: Mutex<bool>,
}

impl MockConnection {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PeerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            events,
            log: Mutex::new(ConnectionLog::default()),
            channel_open: Mutex::new(false),
        });
        (connection, rx)
    }

    /// Raise an event as the connection would
    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event);
    }

    /// Raise `DataChannelOpen` and start accepting `send_text`
    pub async fn open_data_channel(&self, label: &str) {
        *self.channel_open.lock().await = true;
        self.emit(PeerEvent::DataChannelOpen {
            label: label.to_string(),
        });
    }

    pub async fn local_descriptions(&self) -> Vec<SessionDescription> {
        self.log.lock().await.local.clone()
    }

    pub async fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.log.lock().await.remote.clone()
    }

    pub async fn added_candidates(&self) -> Vec<IceCandidate> {
        self.log.lock().await.candidates.clone()
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.log.lock().await.texts.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.log.lock().await.closed
    }
}

#[async_trait]
impl PeerConnection for MockConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::offer("v=0\r\ns=mock-offer\r\n"))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        Ok(SessionDescription::answer("v=0\r\ns=mock-answer\r\n"))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.log.lock().await.local.push(desc);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.log.lock().await.remote.push(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.log.lock().await.candidates.push(candidate);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        if !*self.channel_open.lock().await {
            return Err(Error::PeerConnection("data channel not open".to_string()));
        }
        self.log.lock().await.texts.push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().await.closed = true;
        Ok(())
    }
}

/// One message delivered through a [`MockChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Offer(SessionDescription),
    Candidate(IceCandidate),
}

#[derive(Debug, Default)]
struct ChannelState {
    sent: Vec<Sent>,
    offer_reply: Option<SessionDescription>,
    pull_queue: VecDeque<IceCandidate>,
    polls: usize,
    fail_with: Option<Error>,
}

/// Recording signaling channel
#[derive(Default)]
pub struct MockChannel {
    state: Mutex<ChannelState>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reply to the offer with `answer`
    pub fn with_answer(answer: SessionDescription) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChannelState {
                offer_reply: Some(answer),
                ..Default::default()
            }),
        })
    }

    /// Candidates the remote side serves to pulls, in order
    pub async fn queue_for_pull(&self, candidates: impl IntoIterator<Item = IceCandidate>) {
        self.state.lock().await.pull_queue.extend(candidates);
    }

    /// Make every following delivery fail with `error`
    pub async fn fail_with(&self, error: Error) {
        self.state.lock().await.fail_with = Some(error);
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.state.lock().await.sent.clone()
    }

    /// Candidates delivered so far, in delivery order
    pub async fn sent_candidates(&self) -> Vec<IceCandidate> {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .filter_map(|s| match s {
                Sent::Candidate(c) => Some(c.clone()),
                Sent::Offer(_) => None,
            })
            .collect()
    }

    pub async fn polls(&self) -> usize {
        self.state.lock().await.polls
    }
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn send_offer(&self, offer: &SessionDescription) -> Result<Option<SessionDescription>> {
        let mut state = self.state.lock().await;
        if let Some(e) = &state.fail_with {
            return Err(e.clone());
        }
        state.sent.push(Sent::Offer(offer.clone()));
        Ok(state.offer_reply.clone())
    }

    async fn send_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(e) = &state.fail_with {
            return Err(e.clone());
        }
        state.sent.push(Sent::Candidate(candidate.clone()));
        Ok(())
    }

    async fn pull_candidate(&self) -> Result<Option<IceCandidate>> {
        let mut state = self.state.lock().await;
        if let Some(e) = &state.fail_with {
            return Err(e.clone());
        }
        state.polls += 1;
        Ok(state.pull_queue.pop_front())
    }
}
