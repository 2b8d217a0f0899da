//! Candidate buffer actor
//!
//! Local candidates that may not be sent yet are held here. A single task
//! owns the queue and applies commands in arrival order, so an enqueue can
//! never land in the middle of a drain and two drains never overlap.

use crate::types::IceCandidate;
use crate::{Error, Result};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

enum BufferCommand {
    Enqueue(IceCandidate),
    DrainAll(oneshot::Sender<Vec<IceCandidate>>),
    PopFront(oneshot::Sender<Option<IceCandidate>>),
    Len(oneshot::Sender<usize>),
}

/// Handle to the candidate buffer actor
///
/// Cloning the handle shares the same queue. The actor stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct CandidateBuffer {
    tx: mpsc::UnboundedSender<BufferCommand>,
}

impl CandidateBuffer {
    /// Spawn the actor on the current runtime
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_buffer(rx));
        Self { tx }
    }

    /// Append a candidate to the tail of the queue
    pub fn enqueue(&self, candidate: IceCandidate) -> Result<()> {
        self.tx
            .send(BufferCommand::Enqueue(candidate))
            .map_err(|_| closed())
    }

    /// Remove and return every queued candidate, oldest first
    ///
    /// Returns an empty vector when nothing is queued.
    pub async fn drain_all(&self) -> Result<Vec<IceCandidate>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BufferCommand::DrainAll(reply_tx))
            .map_err(|_| closed())?;
        reply_rx.await.map_err(|_| closed())
    }

    /// Remove and return the oldest queued candidate
    pub async fn pop_front(&self) -> Result<Option<IceCandidate>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BufferCommand::PopFront(reply_tx))
            .map_err(|_| closed())?;
        reply_rx.await.map_err(|_| closed())
    }

    /// Number of queued candidates
    pub async fn len(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BufferCommand::Len(reply_tx))
            .map_err(|_| closed())?;
        reply_rx.await.map_err(|_| closed())
    }

    /// Whether no candidates are queued
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

fn closed() -> Error {
    Error::ChannelClosed("candidate buffer stopped".to_string())
}

async fn run_buffer(mut rx: mpsc::UnboundedReceiver<BufferCommand>) {
    let mut queue: VecDeque<IceCandidate> = VecDeque::new();

    while let Some(command) = rx.recv().await {
        match command {
            BufferCommand::Enqueue(candidate) => {
                trace!("Buffering candidate {}", candidate);
                queue.push_back(candidate);
            }
            BufferCommand::DrainAll(reply) => {
                let drained: Vec<IceCandidate> = queue.drain(..).collect();
                debug!("Draining {} buffered candidates", drained.len());
                // Requester gone: the candidates are dropped with it.
                let _ = reply.send(drained);
            }
            BufferCommand::PopFront(reply) => {
                let _ = reply.send(queue.pop_front());
            }
            BufferCommand::Len(reply) => {
                let _ = reply.send(queue.len());
            }
        }
    }

    debug!("Candidate buffer stopped with {} queued", queue.len());
}
