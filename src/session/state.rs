//! Session state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Created, waiting for the holder's first contact.
    #[default]
    Initialized,
    /// Holder fetched the request and a protocol version was agreed.
    Connected,
    /// A result was produced, successful or not.
    Done,
    /// Deleted before completion.
    Cancelled,
    /// Expired before completion.
    Timeout,
}

impl Status {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Initialized -> Connected
    /// - Initialized | Connected -> Done | Cancelled | Timeout
    pub fn can_transition_to(&self, target: Status) -> bool {
        use Status::*;
        matches!(
            (*self, target),
            (Initialized, Connected)
                | (Initialized | Connected, Done)
                | (Initialized | Connected, Cancelled)
                | (Initialized | Connected, Timeout)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: Status) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::SessionError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_finished(&self) -> bool {
        matches!(self, Status::Done | Status::Cancelled | Status::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initialized => "INITIALIZED",
            Status::Connected => "CONNECTED",
            Status::Done => "DONE",
            Status::Cancelled => "CANCELLED",
            Status::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = Status::Initialized;
        assert!(state.transition_to(Status::Connected).is_ok());
        assert_eq!(state, Status::Connected);

        assert!(state.transition_to(Status::Done).is_ok());
        assert_eq!(state, Status::Done);
    }

    #[test]
    fn test_cancel_or_timeout_from_any_live_state() {
        for live in [Status::Initialized, Status::Connected] {
            for end in [Status::Done, Status::Cancelled, Status::Timeout] {
                assert!(live.can_transition_to(end), "{} -> {}", live, end);
            }
        }
    }

    #[test]
    fn test_invalid_connected_to_initialized() {
        let mut state = Status::Connected;
        assert!(state.transition_to(Status::Initialized).is_err());
        assert!(state.transition_to(Status::Connected).is_err());
        assert_eq!(state, Status::Connected);
    }

    #[test]
    fn test_invalid_from_finished() {
        for end in [Status::Done, Status::Cancelled, Status::Timeout] {
            let mut state = end;
            assert!(state.transition_to(Status::Connected).is_err());
            assert!(state.transition_to(Status::Done).is_err());
            assert!(state.transition_to(Status::Cancelled).is_err());
            assert_eq!(state, end);
        }
    }

    #[test]
    fn test_is_finished() {
        assert!(!Status::Initialized.is_finished());
        assert!(!Status::Connected.is_finished());
        assert!(Status::Done.is_finished());
        assert!(Status::Cancelled.is_finished());
        assert!(Status::Timeout.is_finished());
    }

    #[test]
    fn test_default_and_wire_name() {
        assert_eq!(Status::default(), Status::Initialized);
        assert_eq!(serde_json::to_string(&Status::Timeout).unwrap(), "\"TIMEOUT\"");
        assert_eq!(Status::Cancelled.to_string(), "CANCELLED");
    }
}
