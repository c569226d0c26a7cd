//! `reqwest` implementation of [`Backend`].
//!
//! All requests go through [`HttpBackend::request`], which resolves the path
//! against the configured base URL and attaches the bearer token from the
//! shared [`CredentialContext`] when one is present.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use pocket_config::BackendConfig;

use crate::backend::{classify_rejection, AccessToken, Backend, ByteStream, ChatRequest, SessionInfo};
use crate::credentials::CredentialContext;
use crate::{ChatError, SessionId, Turn};

pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
    credentials: CredentialContext,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, credentials: CredentialContext) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.into()))
            .build()
            .map_err(|e| ChatError::Connectivity(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            credentials,
            request_timeout: Duration::from_secs(config.request_timeout_secs.into()),
        })
    }

    pub fn credentials(&self) -> &CredentialContext {
        &self.credentials
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with the current credential attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.credentials.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a bounded (non-streaming) request and decode its JSON body.
    /// Failures of any kind become `BackendUnavailable`, except an
    /// undecodable 2xx body which is `Decode`.
    pub(crate) async fn call_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, ChatError> {
        let response = self.send_bounded(builder, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ChatError::Decode(format!("{what}: {e}")))
    }

    pub(crate) async fn send_bounded(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, ChatError> {
        let response = builder
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ChatError::BackendUnavailable(format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(ChatError::BackendUnavailable(format!(
                "{what}: HTTP {status}: {text}"
            )));
        }
        Ok(response)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<String, ChatError> {
        #[derive(serde::Deserialize)]
        struct Health {
            status: String,
        }
        let health: Health = self
            .call_json(self.request(Method::GET, "/health"), "health check")
            .await?;
        Ok(health.status)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ChatError> {
        debug!(username, "POST /auth/token");
        let response = self
            .request(Method::POST, "/auth/token")
            .form(&[("username", username), ("password", password)])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ChatError::Connectivity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Authorization("Login failed".into()));
        }
        response
            .json::<AccessToken>()
            .await
            .map_err(|e| ChatError::Decode(format!("login: {e}")))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ChatError> {
        debug!("GET /sessions");
        self.call_json(self.request(Method::GET, "/sessions"), "list sessions")
            .await
    }

    async fn create_session(&self, title: &str) -> Result<SessionInfo, ChatError> {
        debug!(title, "POST /sessions");
        let builder = self
            .request(Method::POST, "/sessions")
            .json(&serde_json::json!({ "title": title }));
        self.call_json(builder, "create session").await
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), ChatError> {
        debug!(session = %id, "DELETE /sessions/{{id}}");
        let builder = self.request(Method::DELETE, &format!("/sessions/{id}"));
        self.send_bounded(builder, "delete session").await?;
        Ok(())
    }

    async fn rename_session(&self, id: &SessionId, title: &str) -> Result<SessionInfo, ChatError> {
        debug!(session = %id, title, "PATCH /sessions/{{id}}");
        let builder = self
            .request(Method::PATCH, &format!("/sessions/{id}"))
            .json(&serde_json::json!({ "title": title }));
        self.call_json(builder, "rename session").await
    }

    async fn session_messages(&self, id: &SessionId) -> Result<Vec<Turn>, ChatError> {
        debug!(session = %id, "GET /sessions/{{id}}/messages");
        let builder = self.request(Method::GET, &format!("/sessions/{id}/messages"));
        self.call_json(builder, "fetch messages").await
    }

    async fn generate_title(
        &self,
        id: &SessionId,
        user_message: &str,
    ) -> Result<SessionInfo, ChatError> {
        debug!(session = %id, "POST /sessions/{{id}}/title");
        let builder = self
            .request(Method::POST, &format!("/sessions/{id}/title"))
            .json(&serde_json::json!({ "user_message": user_message }));
        self.call_json(builder, "generate title").await
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        debug!(
            session = %request.session_id,
            messages = request.messages.len(),
            "POST /chat/completions"
        );

        let response = self
            .request(Method::POST, "/chat/completions")
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(status.as_u16(), &body));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::Connectivity(e.to_string())));
        Ok(body.boxed())
    }
}
