//! ICE server configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// STUN/TURN servers used for candidate gathering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceConfig {
    /// STUN server URLs (stun: or stuns:)
    pub stun_servers: Vec<String>,

    /// TURN server configurations (optional)
    pub turn_servers: Vec<TurnServerConfig>,
}

/// TURN server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServerConfig {
    /// TURN server URL (turn: or turns:)
    pub url: String,

    /// Username for TURN authentication
    pub username: String,

    /// Credential for TURN authentication
    pub credential: String,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
        }
    }
}

impl IceConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a STUN URL does not start with `stun:` or `stuns:`
    /// - a TURN URL does not start with `turn:` or `turns:`
    /// - a TURN entry has an empty username or credential
    pub fn validate(&self) -> Result<()> {
        for url in &self.stun_servers {
            if !url.starts_with("stun:") && !url.starts_with("stuns:") {
                return Err(Error::InvalidConfig(format!(
                    "STUN server must start with stun: or stuns:, got {}",
                    url
                )));
            }
        }

        for turn in &self.turn_servers {
            if !turn.url.starts_with("turn:") && !turn.url.starts_with("turns:") {
                return Err(Error::InvalidConfig(format!(
                    "TURN server must start with turn: or turns:, got {}",
                    turn.url
                )));
            }
            if turn.username.is_empty() || turn.credential.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "TURN server {} requires a username and credential",
                    turn.url
                )));
            }
        }

        Ok(())
    }
}

/// Parse a TURN server from `turn:host:port:username:password`
///
/// The password may itself contain colons.
pub fn parse_turn_server(s: &str) -> Result<TurnServerConfig> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 5 {
        return Err(Error::InvalidConfig(format!(
            "Invalid TURN server format: '{}'. Expected: turn:host:port:username:password",
            s
        )));
    }

    let protocol = parts[0];
    if protocol != "turn" && protocol != "turns" {
        return Err(Error::InvalidConfig(format!(
            "Invalid TURN protocol: '{}'. Expected 'turn' or 'turns'",
            protocol
        )));
    }

    let host = parts[1];
    let port = parts[2];
    let username = parts[3].to_string();
    let credential = parts[4..].join(":");

    Ok(TurnServerConfig {
        url: format!("{}:{}:{}", protocol, host, port),
        username,
        credential,
    })
}
