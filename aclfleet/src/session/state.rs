//! Session lifecycle states.

use std::fmt;

use log::{trace, warn};
use serde::Serialize;

use super::DeviceProperty;
use crate::error::DeviceError;

/// Where a device session is in its lifecycle.
///
/// ```text
/// Idle -> Connected -> PropertyFetched -> ChannelOpen -> CommandsIssued -> Saved -> Closed
///   \________\______________\________________\______________\______________> Failed -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connected,
    PropertyFetched,
    ChannelOpen,
    CommandsIssued,
    Saved,
    Failed,
    Closed,
}

impl SessionState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Connected)
            | (Connected, PropertyFetched)
            | (PropertyFetched, ChannelOpen)
            | (ChannelOpen, CommandsIssued)
            | (CommandsIssued, Saved) => true,
            // relaxed property policy skips a failed query
            (Connected, ChannelOpen) => true,
            (Closed, _) | (Failed, Failed) => false,
            (_, Failed) => !matches!(self, Saved),
            (_, Closed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connected => "connected",
            SessionState::PropertyFetched => "property_fetched",
            SessionState::ChannelOpen => "channel_open",
            SessionState::CommandsIssued => "commands_issued",
            SessionState::Saved => "saved",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One device's session, created at the start of its turn.
#[derive(Debug)]
pub struct DeviceSession {
    pub(super) address: String,
    pub(super) state: SessionState,
    pub(super) history: Vec<SessionState>,
    pub(super) property: Option<DeviceProperty>,
    pub(super) last_response: Option<String>,
    pub(super) last_error: Option<DeviceError>,
    pub(super) cleanup_errors: Vec<String>,
}

impl DeviceSession {
    /// Start a session in [`SessionState::Idle`].
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
            property: None,
            last_response: None,
            last_error: None,
            cleanup_errors: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub(crate) fn advance(&mut self, next: SessionState) {
        if !self.state.can_transition(next) {
            warn!(
                "{}: ignoring illegal transition {} -> {}",
                self.address, self.state, next
            );
            debug_assert!(false, "illegal transition {} -> {}", self.state, next);
            return;
        }
        trace!("{}: {} -> {}", self.address, self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Record the failure and move to [`SessionState::Failed`].
    pub(crate) fn fail(&mut self, error: DeviceError) {
        self.advance(SessionState::Failed);
        self.last_error = Some(error);
    }

    pub(crate) fn set_property(&mut self, property: DeviceProperty) {
        self.property = Some(property);
    }

    pub(crate) fn set_response(&mut self, response: impl Into<String>) {
        self.last_response = Some(response.into());
    }

    pub(crate) fn record_cleanup_failure(&mut self, failure: String) {
        self.cleanup_errors.push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            Idle,
            Connected,
            PropertyFetched,
            ChannelOpen,
            CommandsIssued,
            Saved,
            Closed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        for state in [Idle, Connected, PropertyFetched, ChannelOpen, CommandsIssued] {
            assert!(state.can_transition(Failed), "{state} -> failed");
        }
        assert!(!Saved.can_transition(Failed));
        assert!(!Closed.can_transition(Failed));
        assert!(Failed.can_transition(Closed));
    }

    #[test]
    fn test_no_skipping_or_reopening() {
        assert!(!Idle.can_transition(ChannelOpen));
        assert!(!ChannelOpen.can_transition(Saved));
        assert!(!Closed.can_transition(Closed));
        assert!(!Closed.can_transition(Idle));
        assert!(!Failed.can_transition(Connected));
    }

    #[test]
    fn test_session_records_history() {
        let mut session = DeviceSession::new("10.0.0.1");
        session.advance(Connected);
        session.advance(Closed);

        assert_eq!(session.state, Closed);
        assert_eq!(session.history, vec![Idle, Connected, Closed]);
    }
}
