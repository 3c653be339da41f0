//! Session lifecycle state machine
//!
//! A printing session walks through:
//! - Idle → Scanning (discovery sweep)
//! - Scanning → Connecting → Ready (device matched, endpoints resolved)
//! - Ready ⇄ Transmitting (frame batches)
//! - Closing → Closed | Failed (teardown, always attempted once connected)

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing started yet
    Idle,

    /// Discovery sweep in progress
    Scanning,

    /// Connecting and resolving endpoints
    Connecting,

    /// Connected, endpoints resolved, ready for frames
    Ready,

    /// Writing a frame batch
    Transmitting,

    /// Disconnect in progress
    Closing,

    /// Ended normally
    Closed,

    /// Ended with an error
    Failed,
}

impl SessionState {
    /// Check if no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Check if the device may currently be connected
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Ready | Self::Transmitting | Self::Closing)
    }

    /// Check if `next` is a legal successor of this state
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Idle, Scanning)
                | (Idle, Failed)
                | (Scanning, Connecting)
                | (Scanning, Failed)
                | (Connecting, Ready)
                | (Connecting, Closing)
                | (Connecting, Failed)
                | (Ready, Transmitting)
                | (Ready, Closing)
                | (Transmitting, Ready)
                | (Transmitting, Closing)
                | (Closing, Closed)
                | (Closing, Failed)
        )
    }

    /// Get state name
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Transmitting => "transmitting",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared view of one session's state
///
/// Thread-safe and can be cloned cheaply (Arc internally); every clone sees
/// the same state, so another task can watch a session progress.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    inner: Arc<parking_lot::RwLock<StatusInner>>,
}

#[derive(Debug)]
struct StatusInner {
    state: SessionState,

    /// Every state entered, starting with Idle
    history: Vec<SessionState>,
}

impl SessionStatus {
    /// Create a new idle status
    pub fn new() -> Self {
        Self {
            inner: Arc::new(parking_lot::RwLock::new(StatusInner {
                state: SessionState::Idle,
                history: vec![SessionState::Idle],
            })),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// States entered so far, in order
    pub fn history(&self) -> Vec<SessionState> {
        self.inner.read().history.clone()
    }

    /// Check if the session has ended
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Move to `next`, returning the previous state
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] if `next` is not a legal successor.
    pub fn transition(&self, next: SessionState) -> Result<SessionState> {
        let mut inner = self.inner.write();
        let from = inner.state;

        if !from.can_transition_to(next) {
            return Err(Error::InvalidTransition { from, to: next });
        }

        inner.state = next;
        inner.history.push(next);

        trace!(%from, to = %next, "Session transition");

        Ok(from)
    }

    /// Move to Failed from wherever the session is
    ///
    /// A connected session is routed through Closing first. Already
    /// terminal sessions are left untouched.
    pub fn fail(&self) {
        let mut inner = self.inner.write();
        let from = inner.state;

        if from.is_terminal() {
            return;
        }

        if !from.can_transition_to(SessionState::Failed) {
            inner.history.push(SessionState::Closing);
        }
        inner.state = SessionState::Failed;
        inner.history.push(SessionState::Failed);

        trace!(%from, "Session failed");
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use SessionState::*;

    #[test]
    fn test_status_new() {
        let status = SessionStatus::new();
        assert_eq!(status.state(), Idle);
        assert_eq!(status.history(), vec![Idle]);
        assert!(!status.is_finished());
    }

    #[test]
    fn test_happy_path() {
        let status = SessionStatus::new();

        for next in [Scanning, Connecting, Ready, Transmitting, Ready, Closing, Closed] {
            status.transition(next).unwrap();
        }

        assert_eq!(
            status.history(),
            vec![Idle, Scanning, Connecting, Ready, Transmitting, Ready, Closing, Closed]
        );
        assert!(status.is_finished());
    }

    #[test]
    fn test_invalid_state_transitions() {
        let status = SessionStatus::new();

        // Cannot transmit before discovery
        assert!(matches!(
            status.transition(Transmitting),
            Err(Error::InvalidTransition { from: Idle, to: Transmitting })
        ));

        // Cannot skip connecting
        status.transition(Scanning).unwrap();
        assert!(status.transition(Ready).is_err());

        // Terminal states are final
        status.transition(Failed).unwrap();
        assert!(status.transition(Scanning).is_err());
        assert!(status.transition(Closing).is_err());
    }

    #[test]
    fn test_fail_routes_through_closing() {
        let status = SessionStatus::new();
        for next in [Scanning, Connecting, Ready, Transmitting] {
            status.transition(next).unwrap();
        }

        status.fail();

        assert_eq!(status.state(), Failed);
        assert_eq!(
            status.history(),
            vec![Idle, Scanning, Connecting, Ready, Transmitting, Closing, Failed]
        );
    }

    #[test]
    fn test_fail_is_idempotent() {
        let status = SessionStatus::new();
        status.transition(Scanning).unwrap();
        status.fail();
        status.fail();

        assert_eq!(status.history(), vec![Idle, Scanning, Failed]);
    }

    #[test]
    fn test_connected_states() {
        assert!(Ready.is_connected());
        assert!(Closing.is_connected());
        assert!(!Scanning.is_connected());
        assert!(!Closed.is_connected());
    }

    #[test]
    fn test_status_clone() {
        let status1 = SessionStatus::new();
        let status2 = status1.clone();

        status1.transition(Scanning).unwrap();

        // Both share same state
        assert_eq!(status2.state(), Scanning);
    }
}
