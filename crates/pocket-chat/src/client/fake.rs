//! Scripted in-memory backend for client tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::bytes::Bytes;

use crate::backend::{classify_rejection, AccessToken, Backend, ByteStream, ChatRequest, SessionInfo};
use crate::{ChatError, SessionId, Turn};

pub(super) type ChunkSender = mpsc::UnboundedSender<Result<Bytes, ChatError>>;

/// How the next completion request is answered.
pub(super) enum Reply {
    /// 2xx with the whole body split into these chunks.
    Body(Vec<&'static str>),
    /// Non-2xx status with this body.
    Status(u16, &'static str),
    /// The request never reached the server.
    Unreachable,
    /// 2xx whose body is fed by the test through a channel.
    Live(mpsc::UnboundedReceiver<Result<Bytes, ChatError>>),
    /// The backend call panics inside the exchange task.
    Panic,
}

/// Endpoints that can be switched to fail with `HTTP 503`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Endpoint {
    Create,
    Delete,
    Messages,
    Title,
}

#[derive(Default)]
struct Inner {
    sessions: Vec<SessionInfo>,
    messages: HashMap<SessionId, Vec<Turn>>,
    replies: VecDeque<Reply>,
    requests: Vec<ChatRequest>,
    title_calls: Vec<(SessionId, String)>,
    failing: HashSet<Endpoint>,
    next_id: u32,
}

#[derive(Default)]
pub(super) struct FakeBackend {
    inner: Mutex<Inner>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a server-side session, newest first as the backend lists them.
    pub fn with_session(self, id: &str, title: &str, turns: Vec<Turn>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let id = SessionId::from(id);
            inner.sessions.insert(
                0,
                SessionInfo {
                    id: id.clone(),
                    title: title.to_string(),
                },
            );
            inner.messages.insert(id, turns);
        }
        self
    }

    pub fn reply(&self, reply: Reply) {
        self.inner.lock().unwrap().replies.push_back(reply);
    }

    /// Queue a live reply and hand back the sender that feeds it.
    pub fn live_reply(&self) -> ChunkSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.reply(Reply::Live(rx));
        tx
    }

    pub fn fail(&self, endpoint: Endpoint, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        if fail {
            inner.failing.insert(endpoint);
        } else {
            inner.failing.remove(&endpoint);
        }
    }

    pub fn session_title(&self, id: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .iter()
            .find(|s| s.id.as_str() == id)
            .map(|s| s.title.clone())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn title_calls(&self) -> Vec<(SessionId, String)> {
        self.inner.lock().unwrap().title_calls.clone()
    }
}

pub(super) fn frame(content: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", serde_json::json!({ "content": content })))
}

impl Inner {
    fn check(&self, endpoint: Endpoint) -> Result<(), ChatError> {
        if self.failing.contains(&endpoint) {
            return Err(ChatError::BackendUnavailable("HTTP 503".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, _username: &str, _password: &str) -> Result<AccessToken, ChatError> {
        Ok(AccessToken {
            access_token: "fake-token".into(),
            token_type: Some("bearer".into()),
        })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ChatError> {
        Ok(self.inner.lock().unwrap().sessions.clone())
    }

    async fn create_session(&self, title: &str) -> Result<SessionInfo, ChatError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check(Endpoint::Create)?;
        inner.next_id += 1;
        let session = SessionInfo {
            id: SessionId::from(format!("new-{}", inner.next_id)),
            title: title.to_string(),
        };
        inner.sessions.insert(0, session.clone());
        inner.messages.insert(session.id.clone(), Vec::new());
        Ok(session)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check(Endpoint::Delete)?;
        inner.sessions.retain(|s| &s.id != id);
        inner.messages.remove(id);
        Ok(())
    }

    async fn rename_session(&self, id: &SessionId, title: &str) -> Result<SessionInfo, ChatError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ChatError::BackendUnavailable("HTTP 404".into()))?;
        session.title = title.to_string();
        Ok(session.clone())
    }

    async fn session_messages(&self, id: &SessionId) -> Result<Vec<Turn>, ChatError> {
        let inner = self.inner.lock().unwrap();
        inner.check(Endpoint::Messages)?;
        Ok(inner.messages.get(id).cloned().unwrap_or_default())
    }

    async fn generate_title(
        &self,
        id: &SessionId,
        user_message: &str,
    ) -> Result<SessionInfo, ChatError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .title_calls
            .push((id.clone(), user_message.to_string()));
        inner.check(Endpoint::Title)?;
        let title = format!("About {}", user_message.trim());
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ChatError::BackendUnavailable("HTTP 404".into()))?;
        session.title = title;
        Ok(session.clone())
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let reply = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(request.clone());
            inner.replies.pop_front()
        };
        match reply {
            Some(Reply::Body(chunks)) => Ok(stream::iter(
                chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect::<Vec<_>>(),
            )
            .boxed()),
            Some(Reply::Status(status, body)) => Err(classify_rejection(status, body)),
            Some(Reply::Unreachable) | None => {
                Err(ChatError::Connectivity("connection refused".into()))
            }
            Some(Reply::Panic) => panic!("backend blew up"),
            Some(Reply::Live(rx)) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        }
    }
}
