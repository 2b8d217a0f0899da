//! Process wiring shared by the `offer` and `answer` binaries
//!
//! Each binary listens for signaling on its own address and talks to the
//! other side's address:
//!
//! ```text
//! offer  listens on --offer-address  (:22572), posts to --answer-address
//! answer listens on --answer-address (:22570), posts to --offer-address
//! ```
//!
//! A `:port` listen address binds every interface. A `:port` remote
//! address means the local host.

use clap::Args;
use peerlink_core::{
    shutdown, CandidateDelivery, HeartbeatConfig, PeerRole, Session, SessionConfig, SessionExit,
};
use peerlink_http::{CandidateEncoding, HttpSignalingClient, HttpSignalingConfig, SignalingServer};
use peerlink_webrtc::{parse_turn_server, IceConfig, WebRtcPeerConnection};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Heartbeat period of the offering side
pub const OFFER_HEARTBEAT_MS: u64 = 5000;

/// Heartbeat period of the answering side
pub const ANSWER_HEARTBEAT_MS: u64 = 1000;

/// Flags common to both peers
#[derive(Args, Debug, Clone)]
pub struct PeerArgs {
    /// Signaling address of the offering peer (host:port or :port)
    #[arg(long, default_value = ":22572")]
    pub offer_address: String,

    /// Signaling address of the answering peer (host:port or :port)
    #[arg(long, default_value = ":22570")]
    pub answer_address: String,

    /// Candidate delivery protocol; both peers must agree: push, poll
    #[arg(long, default_value = "push")]
    pub delivery: CandidateDelivery,

    /// Candidate body encoding on the wire: raw, json
    #[arg(long, default_value = "raw")]
    pub candidate_encoding: CandidateEncoding,

    /// STUN servers (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "stun:stun.l.google.com:19302"
    )]
    pub stun_servers: Vec<String>,

    /// TURN servers (format: turn:host:port:username:password, comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub turn_servers: Vec<String>,

    /// Heartbeat period in milliseconds (defaults per peer)
    #[arg(long)]
    pub heartbeat_interval_ms: Option<u64>,

    /// Do not send heartbeat messages
    #[arg(long, default_value_t = false)]
    pub no_heartbeat: bool,

    /// Signaling request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl PeerArgs {
    pub fn session_config(&self, role: PeerRole) -> SessionConfig {
        let heartbeat = if self.no_heartbeat {
            HeartbeatConfig::disabled()
        } else {
            let default_ms = match role {
                PeerRole::Initiator => OFFER_HEARTBEAT_MS,
                PeerRole::Responder => ANSWER_HEARTBEAT_MS,
            };
            HeartbeatConfig::every(self.heartbeat_interval_ms.unwrap_or(default_ms))
        };

        SessionConfig::new(role)
            .with_delivery(self.delivery)
            .with_heartbeat(heartbeat)
    }

    pub fn signaling_config(&self, role: PeerRole) -> HttpSignalingConfig {
        let (listen, remote) = match role {
            PeerRole::Initiator => (&self.offer_address, &self.answer_address),
            PeerRole::Responder => (&self.answer_address, &self.offer_address),
        };

        HttpSignalingConfig {
            listen_address: listen_address(listen),
            remote_address: remote_address(remote),
            candidate_encoding: self.candidate_encoding,
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn ice_config(&self) -> anyhow::Result<IceConfig> {
        let turn_servers = self
            .turn_servers
            .iter()
            .map(|s| parse_turn_server(s))
            .collect::<Result<Vec<_>, _>>()?;

        let ice = IceConfig {
            stun_servers: self.stun_servers.clone(),
            turn_servers,
        };
        ice.validate()?;
        Ok(ice)
    }
}

/// `:port` binds every interface
pub fn listen_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    }
}

/// `:port` reaches the local host
pub fn remote_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("127.0.0.1:{}", port),
        None => address.to_string(),
    }
}

/// Install the fmt subscriber, honoring `RUST_LOG` and falling back to `info`
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run one peer until its connection fails, Ctrl+C, or a fatal error
pub async fn run(role: PeerRole, args: PeerArgs) -> anyhow::Result<SessionExit> {
    let session_config = args.session_config(role);
    session_config.validate()?;
    let signaling = args.signaling_config(role);
    let ice = args.ice_config()?;

    info!(
        "Starting {} peer: listen={} remote={} delivery={:?}",
        role, signaling.listen_address, signaling.remote_address, session_config.delivery
    );

    let (connection, events) = WebRtcPeerConnection::new(role, &ice).await?;
    let client = HttpSignalingClient::new(&signaling)?;

    let (session, handle) = Session::new(session_config, connection.clone(), Arc::new(client), events);

    let (trigger, shutdown) = shutdown::channel();

    // Bound before the session starts so an early answer has somewhere to land
    let listener = SignalingServer::bind(&signaling.listen_address).await?;
    let server = tokio::spawn(
        SignalingServer::new(handle, signaling.candidate_encoding)
            .serve(listener, trigger.subscribe()),
    );

    let ctrl_c = {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
                trigger.trigger();
            }
        })
    };

    let result = session.run(shutdown).await;

    trigger.trigger();
    ctrl_c.abort();

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Signaling server error: {}", e),
        Err(e) => warn!("Signaling server task failed: {}", e),
    }

    if let Err(e) = peerlink_core::PeerConnection::close(connection.as_ref()).await {
        warn!("Failed to close peer connection: {}", e);
    }

    Ok(result?)
}

/// Exit status for a finished peer
///
/// A failed connection exits 0 like a shutdown; only fatal errors exit 1.
pub fn exit_status(result: &anyhow::Result<SessionExit>) -> u8 {
    match result {
        Ok(SessionExit::ConnectionFailed) => {
            info!("Peer connection failed, exiting");
            0
        }
        Ok(SessionExit::Shutdown) => 0,
        Err(e) => {
            error!("Fatal: {:#}", e);
            1
        }
    }
}

/// Build the runtime, run `role` to completion and map the outcome
pub fn launch(role: PeerRole, args: PeerArgs) -> ExitCode {
    init_tracing();

    let thread_name = match role {
        PeerRole::Initiator => "offer-worker",
        PeerRole::Responder => "answer-worker",
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name(thread_name)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(role, args));
    ExitCode::from(exit_status(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        peer: PeerArgs,
    }

    fn parse(args: &[&str]) -> PeerArgs {
        let mut argv = vec!["peer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().peer
    }

    #[test]
    fn test_address_normalization() {
        assert_eq!(listen_address(":22572"), "0.0.0.0:22572");
        assert_eq!(remote_address(":22570"), "127.0.0.1:22570");
        assert_eq!(remote_address("10.0.0.5:22570"), "10.0.0.5:22570");
    }

    #[test]
    fn test_default_addresses_point_at_each_other() {
        let args = parse(&[]);

        let offer = args.signaling_config(PeerRole::Initiator);
        assert_eq!(offer.listen_address, "0.0.0.0:22572");
        assert_eq!(offer.remote_address, "127.0.0.1:22570");

        let answer = args.signaling_config(PeerRole::Responder);
        assert_eq!(answer.listen_address, "0.0.0.0:22570");
        assert_eq!(answer.remote_address, "127.0.0.1:22572");
    }

    #[test]
    fn test_heartbeat_defaults_per_role() {
        let args = parse(&[]);
        assert_eq!(
            args.session_config(PeerRole::Initiator).heartbeat.interval_ms,
            OFFER_HEARTBEAT_MS
        );
        assert_eq!(
            args.session_config(PeerRole::Responder).heartbeat.interval_ms,
            ANSWER_HEARTBEAT_MS
        );

        let args = parse(&["--heartbeat-interval-ms", "250"]);
        assert_eq!(
            args.session_config(PeerRole::Responder).heartbeat.interval_ms,
            250
        );

        let args = parse(&["--no-heartbeat"]);
        assert!(!args.session_config(PeerRole::Initiator).heartbeat.enabled);
    }

    #[test]
    fn test_protocol_flags() {
        let args = parse(&["--delivery", "poll", "--candidate-encoding", "json"]);
        assert_eq!(args.delivery, CandidateDelivery::Poll);
        assert_eq!(args.candidate_encoding, CandidateEncoding::Json);

        assert!(Cli::try_parse_from(["peer", "--delivery", "carrier-pigeon"]).is_err());
    }

    #[test]
    fn test_ice_config_from_flags() {
        let args = parse(&[
            "--stun-servers",
            "stun:a.example.com:3478,stun:b.example.com:3478",
            "--turn-servers",
            "turn:turn.example.com:3478:alice:pa:ss",
        ]);
        let ice = args.ice_config().unwrap();
        assert_eq!(ice.stun_servers.len(), 2);
        assert_eq!(ice.turn_servers[0].credential, "pa:ss");

        let args = parse(&["--turn-servers", "turn:missing-credentials"]);
        assert!(args.ice_config().is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(SessionExit::ConnectionFailed)), 0);
        assert_eq!(exit_status(&Ok(SessionExit::Shutdown)), 0);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("boom"))), 1);
    }
}
