//! Configuration types for a signaling session

use crate::types::PeerRole;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Role of this process (fixed for the session)
    pub role: PeerRole,

    /// How candidates travel between the peers (default: Push)
    pub delivery: CandidateDelivery,

    /// Periodic data channel messages once the channel opens
    pub heartbeat: HeartbeatConfig,

    /// What to do when the connection reports `failed` (default: FailFast)
    pub failure_policy: FailurePolicy,
}

/// Candidate delivery protocol
///
/// Push and poll are two different wire protocols. Both peers must be
/// configured with the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateDelivery {
    /// Each side POSTs its candidates to the other's `/candidate` endpoint
    #[default]
    Push,
    /// The responder queues its candidates; the initiator pulls them from
    /// `/getcandidate` until the queue reports empty
    Poll,
}

impl std::str::FromStr for CandidateDelivery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "push" => Ok(CandidateDelivery::Push),
            "poll" => Ok(CandidateDelivery::Poll),
            other => Err(Error::InvalidConfig(format!(
                "delivery must be push or poll, got {}",
                other
            ))),
        }
    }
}

/// Policy applied when the connection reports `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// End the session as soon as the connection fails
    #[default]
    FailFast,
    /// Log the failure and keep running
    LogOnly,
}

/// Heartbeat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Send heartbeats once the data channel opens (default: true)
    pub enabled: bool,

    /// Interval between messages in milliseconds (default: 5000)
    pub interval_ms: u64,

    /// Length of each random alphanumeric message (default: 15)
    pub message_len: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
            message_len: 15,
        }
    }
}

impl HeartbeatConfig {
    /// Heartbeat with the given interval and default length
    pub fn every(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Default::default()
        }
    }

    /// Heartbeat that never fires
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate heartbeat parameters
    ///
    /// # Errors
    ///
    /// Returns an error if `interval_ms` or `message_len` is zero while
    /// the heartbeat is enabled.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.message_len == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat message_len must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl SessionConfig {
    /// Configuration with defaults for the given role
    pub fn new(role: PeerRole) -> Self {
        Self {
            role,
            delivery: CandidateDelivery::default(),
            heartbeat: HeartbeatConfig::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_delivery(mut self, delivery: CandidateDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.heartbeat.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(PeerRole::Initiator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.delivery, CandidateDelivery::Push);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.heartbeat.message_len, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SessionConfig::new(PeerRole::Responder).with_heartbeat(HeartbeatConfig::every(0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_disabled_heartbeat_skips_validation() {
        let mut heartbeat = HeartbeatConfig::disabled();
        heartbeat.interval_ms = 0;
        assert!(heartbeat.validate().is_ok());
    }

    #[test]
    fn test_delivery_from_str() {
        assert_eq!("push".parse::<CandidateDelivery>().unwrap(), CandidateDelivery::Push);
        assert_eq!("POLL".parse::<CandidateDelivery>().unwrap(), CandidateDelivery::Poll);
        assert!("pull".parse::<CandidateDelivery>().is_err());
    }
}
