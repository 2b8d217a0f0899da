//! Offering peer
//!
//! Creates the data channel, posts its offer to the answering peer and
//! exchanges candidates until the connection is up.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin offer -- --answer-address 10.0.0.5:22570
//! ```

use clap::Parser;
use peerlink_core::PeerRole;
use peerlink_peer::PeerArgs;
use std::process::ExitCode;

/// PeerLink offering peer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    peer: PeerArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    peerlink_peer::launch(PeerRole::Initiator, args.peer)
}
