//! Streaming chat session client for a PocketLLM backend.
//!
//! Provides:
//! - A `Backend` seam over the REST + streaming API, with a `reqwest` implementation
//! - An incremental decoder for the `data: {...}` frame stream
//! - Session registry and per-session message logs
//! - A `SessionClient` state machine that drives one exchange at a time and
//!   recovers from quota, authorization and network failures
//! - Title synthesis after a session's first exchange
//! - Admin endpoints for operators

pub mod admin;
pub mod backend;
pub mod client;
pub mod credentials;
pub mod http;
pub mod log;
pub mod registry;
pub mod stream;
pub mod title;

pub use admin::AdminApi;
pub use backend::{Backend, ByteStream, ChatRequest, SessionInfo};
pub use client::{ClientState, ClientUpdate, LimitState, RejectReason, SessionClient, Submission};
pub use credentials::{CredentialContext, UserRole};
pub use http::HttpBackend;
pub use log::MessageLog;
pub use registry::SessionRegistry;
pub use stream::{Fragment, FrameCodec, FrameEvent};

pub use pocket_common::SessionId;

/// Shown in the transcript when the backend cannot be reached.
pub const CONNECTIVITY_MESSAGE: &str = "Error: Could not connect to the server.";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The request never completed (DNS, refused connection, reset stream,
    /// or a non-2xx status outside the quota/authorization classes).
    #[error("connectivity failure: {0}")]
    Connectivity(String),
    /// HTTP 403; carries the server's `detail` verbatim.
    #[error("authorization failure: {0}")]
    Authorization(String),
    /// HTTP 400 whose `detail` mentions a maximum.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// A session CRUD call failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The backend reported a failure inside the stream.
    #[error("generation failed: {0}")]
    Generation(String),
    /// The current credential lacks the role an operation needs.
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Transport errors surfacing through `tokio` I/O adapters. A `ChatError`
/// that was wrapped on the way in comes back out unchanged.
impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        e.get_ref()
            .and_then(|inner| inner.downcast_ref::<ChatError>())
            .cloned()
            .unwrap_or_else(|| ChatError::Connectivity(e.to_string()))
    }
}
