//! UI-observable status of the session client.

use std::fmt;

use crate::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    /// Request sent, no fragment applied yet.
    AwaitingFirstFragment,
    Streaming,
    /// The backend refused the last turn on quota grounds. Cleared by
    /// creating or selecting a session.
    LimitReached,
    /// Passed through while an error notice is recorded; the client then
    /// settles in `Idle`.
    Errored,
}

impl ClientState {
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ClientState::AwaitingFirstFragment | ClientState::Streaming
        )
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Idle => "idle",
            ClientState::AwaitingFirstFragment => "awaiting first fragment",
            ClientState::Streaming => "streaming",
            ClientState::LimitReached => "limit reached",
            ClientState::Errored => "errored",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitState {
    pub reached: bool,
    pub message: String,
}

impl LimitState {
    pub fn reached(message: impl Into<String>) -> Self {
        Self {
            reached: true,
            message: message.into(),
        }
    }
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    Busy,
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The exchange is running against this session.
    Started(SessionId),
    /// Nothing was appended and no request was made.
    Rejected(RejectReason),
}
