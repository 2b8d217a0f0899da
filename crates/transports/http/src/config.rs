//! Configuration for the HTTP signaling channel

use crate::error::{Error, Result};
use crate::wire::CandidateEncoding;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP signaling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSignalingConfig {
    /// Address the local signaling server binds to (e.g. "0.0.0.0:22572")
    pub listen_address: String,

    /// `host:port` of the remote peer's signaling server
    pub remote_address: String,

    /// Body format of `POST /candidate` (default: Raw)
    pub candidate_encoding: CandidateEncoding,

    /// Timeout for each outbound request in seconds (default: 30)
    pub request_timeout_secs: u64,
}

impl Default for HttpSignalingConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:22572".to_string(),
            remote_address: "127.0.0.1:22570".to_string(),
            candidate_encoding: CandidateEncoding::default(),
            request_timeout_secs: 30,
        }
    }
}

impl HttpSignalingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL of the remote peer's signaling server
    pub fn base_url(&self) -> String {
        if self.remote_address.starts_with("http://") || self.remote_address.starts_with("https://") {
            self.remote_address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.remote_address)
        }
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `listen_address` is not a socket address
    /// - `remote_address` has no port
    /// - `request_timeout_secs` is 0
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "listen_address must be ip:port, got {}",
                self.listen_address
            )));
        }

        let authority = self
            .remote_address
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');
        let has_port = authority
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !has_port {
            return Err(Error::InvalidConfig(format!(
                "remote_address must be host:port, got {}",
                self.remote_address
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = HttpSignalingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://127.0.0.1:22570");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_keeps_scheme() {
        let config = HttpSignalingConfig {
            remote_address: "https://peer.example.com:8443/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://peer.example.com:8443");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_addresses() {
        let config = HttpSignalingConfig {
            listen_address: ":22572".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HttpSignalingConfig {
            remote_address: "localhost".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = HttpSignalingConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
