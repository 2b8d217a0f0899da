//! Answering peer
//!
//! Waits for an offer on its signaling address, answers it and adopts the
//! data channel the offering peer opens.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin answer -- --offer-address 10.0.0.4:22572
//! ```

use clap::Parser;
use peerlink_core::PeerRole;
use peerlink_peer::PeerArgs;
use std::process::ExitCode;

/// PeerLink answering peer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    peer: PeerArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    peerlink_peer::launch(PeerRole::Responder, args.peer)
}
