//! HTTP signaling server
//!
//! Provides the inbound half of the signaling channel:
//! - POST /sdp - Remote session description (replies with the answer, if any)
//! - POST /candidate - One remote candidate
//! - POST /getcandidate - Pop one locally queued candidate (poll delivery)
//! - GET /health - Health check
//!
//! Handlers only decode and forward. Every decision is made by the session
//! loop behind the [`SessionHandle`].

use crate::error::{Error, Result};
use crate::wire::{self, CandidateEncoding};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use peerlink_core::{ErrorKind, SessionHandle, Shutdown};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Server state shared across handlers
#[derive(Clone)]
struct ServerState {
    session: SessionHandle,
    encoding: CandidateEncoding,
}

/// HTTP server feeding a signaling session
pub struct SignalingServer {
    state: ServerState,
}

impl SignalingServer {
    pub fn new(session: SessionHandle, encoding: CandidateEncoding) -> Self {
        Self {
            state: ServerState { session, encoding },
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/sdp", post(sdp_handler))
            .route("/candidate", post(candidate_handler))
            .route("/getcandidate", post(getcandidate_handler))
            .with_state(self.state.clone())
            .layer(
                tower::ServiceBuilder::new()
                    .layer(tower_http::trace::TraceLayer::new_for_http()),
            )
    }

    /// Bind a listener for [`serve`](Self::serve)
    pub async fn bind(address: &str) -> Result<TcpListener> {
        let addr: std::net::SocketAddr = address
            .parse()
            .map_err(|e| Error::ServerError(format!("Invalid bind address: {}", e)))?;

        TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ServerError(format!("Failed to bind {}: {}", addr, e)))
    }

    /// Serve until `shutdown` fires
    pub async fn serve(self, listener: TcpListener, mut shutdown: Shutdown) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Signaling server listening on {}", addr);
        }

        let router = self.router();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .map_err(|e| Error::ServerError(format!("Server error: {}", e)))?;

        debug!("Signaling server stopped");
        Ok(())
    }
}

/// Map a session error to a status code and plain-text body
fn error_response(e: &peerlink_core::Error) -> Response {
    let status = match e.kind() {
        ErrorKind::Decode => StatusCode::BAD_REQUEST,
        ErrorKind::Negotiation => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}

/// Report a malformed payload to the session and answer 400
async fn reject(state: &ServerState, e: Error) -> Response {
    let e = peerlink_core::Error::from(e);
    warn!("Rejecting signaling payload: {}", e);
    if let Err(closed) = state.session.fault(e.clone()).await {
        debug!("Session already gone: {}", closed);
    }
    error_response(&e)
}

// Handler implementations

/// Health check endpoint
async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// POST /sdp - Remote session description
async fn sdp_handler(State(state): State<ServerState>, body: Bytes) -> Response {
    let desc = match wire::decode_description(&body) {
        Ok(desc) => desc,
        Err(e) => return reject(&state, e).await,
    };
    info!("Received {} over /sdp", desc.sdp_type);

    match state.session.remote_description(desc).await {
        Ok(Some(answer)) => Json(answer).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /candidate - One remote candidate
async fn candidate_handler(State(state): State<ServerState>, body: Bytes) -> Response {
    let candidate = match state.encoding.decode(&body) {
        Ok(candidate) => candidate,
        Err(e) => return reject(&state, e).await,
    };
    debug!("Received remote candidate {}", candidate);

    match state.session.remote_candidate(candidate).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /getcandidate - Pop one queued candidate, empty body once drained
async fn getcandidate_handler(State(state): State<ServerState>) -> Response {
    match state.session.pull_candidate().await {
        Ok(Some(candidate)) => {
            debug!("Serving candidate {}", candidate);
            Json(candidate).into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e),
    }
}
