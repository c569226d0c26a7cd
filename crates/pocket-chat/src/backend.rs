//! The seam between the session client and the inference backend.
//!
//! Every endpoint the client consumes is a method on [`Backend`]. The
//! production implementation is [`crate::HttpBackend`]; tests substitute a
//! scripted in-memory backend.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::bytes::Bytes;

use crate::{ChatError, SessionId, Turn};

/// Raw response body of a chat completion, chunked as it arrives.
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// A server-persisted conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub title: String,
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
    pub temperature: f64,
    pub session_id: SessionId,
}

/// Body of a successful `POST /auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ChatError>;

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ChatError>;

    async fn create_session(&self, title: &str) -> Result<SessionInfo, ChatError>;

    async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError>;

    async fn rename_session(&self, id: &SessionId, title: &str) -> Result<SessionInfo, ChatError>;

    async fn session_messages(&self, id: &SessionId) -> Result<Vec<Turn>, ChatError>;

    async fn generate_title(
        &self,
        id: &SessionId,
        user_message: &str,
    ) -> Result<SessionInfo, ChatError>;

    /// Issue one completion request. Resolves once response headers are in;
    /// the body is returned undecoded.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;
}

/// Classify a non-2xx completion response.
///
/// 400 with a `detail` mentioning "maximum" is a quota rejection, 403 is an
/// authorization failure carrying `detail` verbatim, anything else is a
/// generic transport failure.
pub fn classify_rejection(status: u16, body: &str) -> ChatError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from));

    match (status, detail) {
        (400, Some(detail)) if detail.contains("maximum") => ChatError::QuotaExceeded(detail),
        (403, Some(detail)) => ChatError::Authorization(detail),
        (403, None) => ChatError::Authorization(body.trim().to_string()),
        _ => {
            let snippet: String = body.chars().take(200).collect();
            ChatError::Connectivity(format!("HTTP {status}: {snippet}"))
        }
    }
}
