use std::fmt;

use crate::error::SessionError;

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Inputs that drive the lifecycle. Timer ticks are not events; they never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Answer,
    Navigate,
    Finish,
}

impl SessionState {
    /// Transition table. Returns the next state or the reason the event is rejected.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` for a second start,
    /// `SessionError::NotInProgress` before start and `SessionError::Completed` after finish.
    pub fn on(self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::NotStarted, E::Start) => Ok(S::InProgress),
            (S::InProgress | S::Completed, E::Start) => Err(SessionError::AlreadyStarted),

            (S::InProgress, E::Answer | E::Navigate) => Ok(S::InProgress),
            (S::InProgress, E::Finish) => Ok(S::Completed),

            (S::NotStarted, E::Answer | E::Navigate | E::Finish) => {
                Err(SessionError::NotInProgress)
            }
            (S::Completed, E::Answer | E::Navigate | E::Finish) => Err(SessionError::Completed),
        }
    }

    #[must_use]
    pub fn is_running(self) -> bool {
        self == SessionState::InProgress
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::NotStarted => "not-started",
            SessionState::InProgress => "in-progress",
            SessionState::Completed => "completed",
        };
        f.write_str(label)
    }
}
