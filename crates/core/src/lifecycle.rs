//! Connection lifecycle monitor

use crate::config::FailurePolicy;
use crate::types::{ConnectionState, PeerRole};
use tracing::{error, info, warn};

/// Decision returned for each observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorVerdict {
    Continue,
    /// The session should end; the top-level handler decides how
    Terminate,
}

/// Observes connection state changes and applies the failure policy
///
/// The monitor only observes. It never drives the connection.
#[derive(Debug)]
pub struct LifecycleMonitor {
    role: PeerRole,
    policy: FailurePolicy,
    current: Option<ConnectionState>,
}

impl LifecycleMonitor {
    pub fn new(role: PeerRole, policy: FailurePolicy) -> Self {
        Self {
            role,
            policy,
            current: None,
        }
    }

    /// Last observed state
    pub fn current(&self) -> Option<ConnectionState> {
        self.current
    }

    /// Record a state notification and decide whether the session continues
    pub fn observe(&mut self, state: ConnectionState) -> MonitorVerdict {
        if self.current == Some(state) {
            return MonitorVerdict::Continue;
        }
        self.current = Some(state);

        match state {
            ConnectionState::Failed => {
                error!(role = %self.role, %state, "Peer connection failed");
                match self.policy {
                    FailurePolicy::FailFast => MonitorVerdict::Terminate,
                    FailurePolicy::LogOnly => MonitorVerdict::Continue,
                }
            }
            ConnectionState::Disconnected => {
                warn!(role = %self.role, %state, "Peer connection disconnected");
                MonitorVerdict::Continue
            }
            _ => {
                info!(role = %self.role, %state, "Peer connection state changed");
                MonitorVerdict::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_terminates_with_fail_fast() {
        let mut monitor = LifecycleMonitor::new(PeerRole::Initiator, FailurePolicy::FailFast);
        assert_eq!(monitor.observe(ConnectionState::Connecting), MonitorVerdict::Continue);
        assert_eq!(monitor.observe(ConnectionState::Failed), MonitorVerdict::Terminate);
    }

    #[test]
    fn test_failed_logged_only() {
        let mut monitor = LifecycleMonitor::new(PeerRole::Responder, FailurePolicy::LogOnly);
        assert_eq!(monitor.observe(ConnectionState::Failed), MonitorVerdict::Continue);
        assert_eq!(monitor.current(), Some(ConnectionState::Failed));
    }

    #[test]
    fn test_other_states_continue() {
        let mut monitor = LifecycleMonitor::new(PeerRole::Initiator, FailurePolicy::FailFast);
        for state in [
            ConnectionState::New,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
            ConnectionState::Closed,
        ] {
            assert_eq!(monitor.observe(state), MonitorVerdict::Continue);
            assert_eq!(monitor.current(), Some(state));
        }
    }

    #[test]
    fn test_repeated_state_ignored() {
        let mut monitor = LifecycleMonitor::new(PeerRole::Initiator, FailurePolicy::FailFast);
        assert_eq!(monitor.observe(ConnectionState::Failed), MonitorVerdict::Terminate);
        // A repeated notification is not a new transition
        assert_eq!(monitor.observe(ConnectionState::Failed), MonitorVerdict::Continue);
        assert_eq!(monitor.current(), Some(ConnectionState::Failed));
    }
}
