//! Session dispatch loop
//!
//! One task owns the negotiation state and every mutation of the peer
//! connection. Connection callbacks, signaling handlers and the heartbeat
//! all reach it through channels, so the connection only ever sees one
//! operation at a time.
//!
//! Network sends go through the outbox, a second task that delivers
//! outbound messages in FIFO order and reports each result back. The loop
//! itself never waits on the network.

use crate::buffer::CandidateBuffer;
use crate::config::{CandidateDelivery, SessionConfig};
use crate::connection::PeerConnection;
use crate::events::{PeerEvent, SessionCommand, SessionExit, SessionSnapshot};
use crate::heartbeat;
use crate::lifecycle::{LifecycleMonitor, MonitorVerdict};
use crate::negotiation::{CandidateRoute, Negotiation, RemoteCandidateRoute};
use crate::shutdown::Shutdown;
use crate::signaling::SignalingChannel;
use crate::types::{ConnectionState, IceCandidate, PeerRole, SessionDescription};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Handle used by signaling handlers and the heartbeat to reach a session
///
/// Every method is a request answered by the session loop. Once the loop
/// has ended they all fail with [`Error::ChannelClosed`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Hand over the remote peer's session description
    ///
    /// Returns the local answer when the remote description was an offer.
    pub async fn remote_description(&self, desc: SessionDescription) -> Result<Option<SessionDescription>> {
        self.request(|reply| SessionCommand::RemoteDescription { desc, reply })
            .await?
    }

    /// Hand over one candidate from the remote peer
    pub async fn remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.request(|reply| SessionCommand::RemoteCandidate { candidate, reply })
            .await?
    }

    /// Pop one queued local candidate for a pulling peer
    pub async fn pull_candidate(&self) -> Result<Option<IceCandidate>> {
        self.request(|reply| SessionCommand::PullCandidate { reply })
            .await?
    }

    /// Send text over the data channel
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendText { text, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Report a malformed inbound payload
    ///
    /// The session ends with `error`.
    pub async fn fault(&self, error: Error) -> Result<()> {
        self.tx.send(SessionCommand::Fault { error }).await?;
        Ok(())
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await?;
        Ok(reply_rx.await?)
    }
}

#[cfg(test)]
impl SessionHandle {
    /// Handle whose commands land in the returned receiver instead of a session
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

/// Message queued on the outbox
#[derive(Debug)]
enum Outbound {
    Offer(SessionDescription),
    Candidate(IceCandidate),
    /// Pull candidates until the remote queue reports empty
    PullCandidates,
}

/// Result reported back by the outbox
#[derive(Debug)]
enum Delivery {
    OfferReply(Option<SessionDescription>),
    Pulled(IceCandidate),
    PullFinished,
    Failed(Error),
}

fn spawn_outbox(
    channel: Arc<dyn SignalingChannel>,
    deliveries: mpsc::UnboundedSender<Delivery>,
) -> (mpsc::UnboundedSender<Outbound>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let outcome = match message {
                Outbound::Offer(offer) => channel
                    .send_offer(&offer)
                    .await
                    .map(|reply| vec![Delivery::OfferReply(reply)]),
                Outbound::Candidate(candidate) => {
                    debug!("Delivering candidate {}", candidate);
                    channel.send_candidate(&candidate).await.map(|_| Vec::new())
                }
                Outbound::PullCandidates => pull_all(channel.as_ref(), &deliveries).await,
            };

            match outcome {
                Ok(reports) => {
                    for report in reports {
                        let _ = deliveries.send(report);
                    }
                }
                Err(e) => {
                    let _ = deliveries.send(Delivery::Failed(e));
                    break;
                }
            }
        }
    });

    (tx, task)
}

/// Pull until the remote queue is empty, reporting each candidate as it
/// arrives
async fn pull_all(
    channel: &dyn SignalingChannel,
    deliveries: &mpsc::UnboundedSender<Delivery>,
) -> Result<Vec<Delivery>> {
    loop {
        match channel.pull_candidate().await? {
            Some(candidate) => {
                let _ = deliveries.send(Delivery::Pulled(candidate));
            }
            None => return Ok(vec![Delivery::PullFinished]),
        }
    }
}

/// A signaling session for one peer role
pub struct Session {
    config: SessionConfig,
    connection: Arc<dyn PeerConnection>,
    channel: Arc<dyn SignalingChannel>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    handle: SessionHandle,
}

impl Session {
    /// Create a session and the handle that feeds it
    ///
    /// Nothing happens until [`run`](Self::run) is awaited.
    pub fn new(
        config: SessionConfig,
        connection: Arc<dyn PeerConnection>,
        channel: Arc<dyn SignalingChannel>,
        events: mpsc::UnboundedReceiver<PeerEvent>,
    ) -> (Self, SessionHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = SessionHandle { tx };

        let session = Self {
            config,
            connection,
            channel,
            events,
            commands,
            handle: handle.clone(),
        };
        (session, handle)
    }

    /// Drive the session until the connection fails, shutdown fires or a
    /// fatal error occurs
    #[instrument(skip_all, fields(role = %self.config.role))]
    pub async fn run(self, mut shutdown: Shutdown) -> Result<SessionExit> {
        let Session {
            config,
            connection,
            channel,
            mut events,
            mut commands,
            handle,
        } = self;

        config.validate()?;

        let (delivery_tx, mut deliveries) = mpsc::unbounded_channel();
        let (outbox, outbox_task) = spawn_outbox(channel, delivery_tx);

        let mut driver = Driver::new(config, connection, handle, outbox, shutdown.clone());

        let result = dispatch(
            &mut driver,
            &mut events,
            &mut deliveries,
            &mut commands,
            &mut shutdown,
        )
        .await;

        if let Err(e) = &result {
            error!("Session ended with error: {}", e);
        }

        driver.stop_heartbeat();
        outbox_task.abort();
        result
    }
}

async fn dispatch(
    driver: &mut Driver,
    events: &mut mpsc::UnboundedReceiver<PeerEvent>,
    deliveries: &mut mpsc::UnboundedReceiver<Delivery>,
    commands: &mut mpsc::Receiver<SessionCommand>,
    shutdown: &mut Shutdown,
) -> Result<SessionExit> {
    driver.start().await?;

    let mut events_open = true;
    loop {
        tokio::select! {
            biased;

            event = events.recv(), if events_open => match event {
                Some(event) => {
                    if let Some(exit) = driver.handle_event(event).await? {
                        return Ok(exit);
                    }
                }
                None => {
                    debug!("Peer connection event stream ended");
                    events_open = false;
                }
            },

            Some(delivery) = deliveries.recv() => {
                driver.handle_delivery(delivery).await?;
            }

            Some(command) = commands.recv() => {
                driver.handle_command(command).await?;
            }

            _ = shutdown.wait() => {
                info!("Shutdown requested");
                return Ok(SessionExit::Shutdown);
            }
        }
    }
}

/// State owned by the running session loop
struct Driver {
    config: SessionConfig,
    connection: Arc<dyn PeerConnection>,
    handle: SessionHandle,
    outbox: mpsc::UnboundedSender<Outbound>,
    shutdown: Shutdown,
    negotiation: Negotiation,
    monitor: LifecycleMonitor,
    buffer: CandidateBuffer,
    /// Remote candidates that raced the answer
    deferred: Vec<IceCandidate>,
    /// Answer reply held until gathering completes (poll-mode responder)
    held_reply: Option<oneshot::Sender<Result<Option<SessionDescription>>>>,
    gathering_complete: bool,
    heartbeat: Option<JoinHandle<()>>,
    polls: usize,
    pulled: usize,
    pull_finished: bool,
}

impl Driver {
    fn new(
        config: SessionConfig,
        connection: Arc<dyn PeerConnection>,
        handle: SessionHandle,
        outbox: mpsc::UnboundedSender<Outbound>,
        shutdown: Shutdown,
    ) -> Self {
        let negotiation = Negotiation::new(config.role, config.delivery);
        let monitor = LifecycleMonitor::new(config.role, config.failure_policy);

        Self {
            config,
            connection,
            handle,
            outbox,
            shutdown,
            negotiation,
            monitor,
            buffer: CandidateBuffer::spawn(),
            deferred: Vec::new(),
            held_reply: None,
            gathering_complete: false,
            heartbeat: None,
            polls: 0,
            pulled: 0,
            pull_finished: false,
        }
    }

    fn role(&self) -> PeerRole {
        self.negotiation.role()
    }

    fn is_poll_responder(&self) -> bool {
        self.role() == PeerRole::Responder && self.config.delivery == CandidateDelivery::Poll
    }

    fn queue(&self, message: Outbound) -> Result<()> {
        self.outbox
            .send(message)
            .map_err(|_| Error::ChannelClosed("outbox stopped".to_string()))
    }

    /// Initiator: create the offer and hand it to the outbox
    async fn start(&mut self) -> Result<()> {
        match self.role() {
            PeerRole::Initiator => {
                let offer = self.connection.create_offer().await?;
                self.connection.set_local_description(offer.clone()).await?;
                self.negotiation.set_local(offer.clone())?;

                self.queue(Outbound::Offer(offer))?;
                self.negotiation.offer_sent()?;
                info!("Offer sent, waiting for answer");
            }
            PeerRole::Responder => {
                info!("Waiting for offer");
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: PeerEvent) -> Result<Option<SessionExit>> {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                info!(
                    address = candidate.address().unwrap_or("unknown"),
                    "Discovered local candidate {}", candidate
                );
                match self.negotiation.route_local_candidate() {
                    CandidateRoute::Forward => self.queue(Outbound::Candidate(candidate))?,
                    CandidateRoute::Buffer | CandidateRoute::HoldForPull => {
                        self.buffer.enqueue(candidate)?
                    }
                }
            }
            PeerEvent::GatheringComplete => {
                debug!("Candidate gathering complete");
                self.gathering_complete = true;
                if let Some(reply) = self.held_reply.take() {
                    let answer = self.negotiation.local_description().cloned();
                    let _ = reply.send(Ok(answer));
                    info!("Answer released to the initiator");
                }
            }
            PeerEvent::StateChanged(state) => {
                if state == ConnectionState::Connected {
                    self.negotiation.converge();
                }
                if self.monitor.observe(state) == MonitorVerdict::Terminate {
                    return Ok(Some(SessionExit::ConnectionFailed));
                }
            }
            PeerEvent::DataChannelOpen { label } => {
                info!(%label, "Data channel open");
                if self.config.heartbeat.enabled && self.heartbeat.is_none() {
                    self.heartbeat = Some(heartbeat::spawn(
                        self.handle.clone(),
                        self.config.heartbeat.clone(),
                        self.shutdown.clone(),
                    ));
                }
            }
            PeerEvent::DataChannelMessage { label, text } => {
                info!("Message from DataChannel '{}': '{}'", label, text);
            }
        }
        Ok(None)
    }

    async fn handle_delivery(&mut self, delivery: Delivery) -> Result<()> {
        match delivery {
            Delivery::OfferReply(Some(answer)) => {
                debug!("Answer received as the offer reply");
                self.apply_remote(answer).await?;
            }
            Delivery::OfferReply(None) => {
                debug!("Offer accepted; answer will arrive separately");
            }
            Delivery::Pulled(candidate) => {
                self.polls += 1;
                self.pulled += 1;
                self.apply_remote_candidate(candidate).await?;
            }
            Delivery::PullFinished => {
                self.polls += 1;
                self.pull_finished = true;
                info!(
                    "Pulled {} remote candidates in {} polls",
                    self.pulled, self.polls
                );
            }
            Delivery::Failed(e) => {
                error!("Signaling delivery failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::RemoteDescription { desc, reply } => {
                match self.apply_remote(desc).await {
                    Ok(answer) => {
                        if answer.is_some() && self.is_poll_responder() && !self.gathering_complete {
                            debug!("Holding answer until candidate gathering completes");
                            self.held_reply = Some(reply);
                        } else {
                            let _ = reply.send(Ok(answer));
                        }
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e.clone()));
                        return Err(e);
                    }
                }
            }
            SessionCommand::RemoteCandidate { candidate, reply } => {
                let result = self.apply_remote_candidate(candidate).await;
                let _ = reply.send(result.clone());
                result?;
            }
            SessionCommand::PullCandidate { reply } => {
                let result = self.serve_pull().await;
                let _ = reply.send(result.clone());
                result?;
            }
            SessionCommand::SendText { text, reply } => {
                // Reported to the caller only; a dead data channel does not
                // end signaling.
                let _ = reply.send(self.connection.send_text(&text).await);
            }
            SessionCommand::Snapshot { reply } => {
                let snapshot = SessionSnapshot {
                    state: self.negotiation.state(),
                    connection: self.monitor.current(),
                    buffered: self.buffer.len().await?,
                    polls: self.polls,
                    pulled: self.pulled,
                    pull_finished: self.pull_finished,
                };
                let _ = reply.send(snapshot);
            }
            SessionCommand::Fault { error } => {
                warn!("Rejected inbound signaling payload: {}", error);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Apply the remote description and everything it unblocks
    ///
    /// Returns the local answer for the responder.
    async fn apply_remote(&mut self, desc: SessionDescription) -> Result<Option<SessionDescription>> {
        self.negotiation.validate_remote(&desc)?;
        self.connection.set_remote_description(desc.clone()).await?;
        self.negotiation.set_remote(desc)?;
        info!("Remote description set");

        let answer = match self.role() {
            PeerRole::Responder => {
                let answer = self.connection.create_answer().await?;
                self.connection.set_local_description(answer.clone()).await?;
                self.negotiation.set_local(answer.clone())?;
                Some(answer)
            }
            PeerRole::Initiator => {
                self.negotiation.begin_candidate_exchange()?;
                None
            }
        };

        if self.negotiation.route_local_candidate() == CandidateRoute::Forward {
            let drained = self.buffer.drain_all().await?;
            if !drained.is_empty() {
                info!("Flushing {} buffered candidates", drained.len());
            }
            for candidate in drained {
                self.queue(Outbound::Candidate(candidate))?;
            }
        }

        let deferred = std::mem::take(&mut self.deferred);
        for candidate in deferred {
            self.connection.add_ice_candidate(candidate).await?;
        }

        if self.role() == PeerRole::Initiator && self.config.delivery == CandidateDelivery::Poll {
            self.queue(Outbound::PullCandidates)?;
        }

        Ok(answer)
    }

    async fn apply_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        match self.negotiation.route_remote_candidate() {
            RemoteCandidateRoute::Apply => {
                debug!("Adding remote candidate {}", candidate);
                self.connection.add_ice_candidate(candidate).await
            }
            RemoteCandidateRoute::Defer => {
                debug!("Deferring remote candidate until the answer is applied");
                self.deferred.push(candidate);
                Ok(())
            }
            RemoteCandidateRoute::Reject => Err(Error::Negotiation(format!(
                "remote candidate received in state {}",
                self.negotiation.state()
            ))),
        }
    }

    async fn serve_pull(&mut self) -> Result<Option<IceCandidate>> {
        if !self.is_poll_responder() {
            return Err(Error::Negotiation(
                "candidate pulls are only served by a poll-mode responder".to_string(),
            ));
        }
        self.buffer.pop_front().await
    }

    fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }
}
