//! The session client: one conversation front end over a [`Backend`].
//!
//! `SessionClient` owns the session registry, a message log per session,
//! and the exchange state machine. Network work for an exchange runs in a
//! spawned task that reports back through a channel; the owner applies
//! those events in order with [`SessionClient::next_update`] or
//! [`SessionClient::drain_updates`]. Every mutation therefore happens on
//! the owner's `&mut self`, and fragments always land in the session that
//! was active when the turn was submitted, whatever is selected by the
//! time they arrive.

pub(crate) mod events;
mod exchange;
mod state;

#[cfg(test)]
mod fake;

pub use events::ClientUpdate;
pub use state::{ClientState, LimitState, RejectReason, Submission};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pocket_common::new_correlation_id;
use pocket_config::ChatConfig;

use crate::backend::{Backend, ChatRequest, SessionInfo};
use crate::log::MessageLog;
use crate::registry::{Removal, SessionRegistry};
use crate::title::{provisional_title, spawn_title_task};
use crate::{ChatError, SessionId, Turn, CONNECTIVITY_MESSAGE};

use events::ClientEvent;
use exchange::spawn_exchange;

/// The exchange currently in flight.
#[derive(Debug)]
struct InFlight {
    exchange: u64,
    session_id: SessionId,
    user_text: String,
    first_exchange: bool,
}

pub struct SessionClient {
    backend: Arc<dyn Backend>,
    temperature: f64,
    title_prefix_chars: usize,
    registry: SessionRegistry,
    /// Transcripts that were loaded from the backend or started locally.
    /// A session with no entry has never had its turns fetched.
    logs: HashMap<SessionId, MessageLog>,
    state: ClientState,
    limit: LimitState,
    last_error: Option<String>,
    in_flight: Option<InFlight>,
    exchange_seq: u64,
    /// Sessions whose title has been requested.
    titled: HashSet<SessionId>,
    pending_titles: usize,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl SessionClient {
    pub fn new(backend: Arc<dyn Backend>, chat: &ChatConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            temperature: chat.temperature,
            title_prefix_chars: chat.title_prefix_chars as usize,
            registry: SessionRegistry::new(),
            logs: HashMap::new(),
            state: ClientState::Idle,
            limit: LimitState::default(),
            last_error: None,
            in_flight: None,
            exchange_seq: 0,
            titled: HashSet::new(),
            pending_titles: 0,
            events_tx,
            events_rx,
        }
    }

    // -- observable state ---------------------------------------------------

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn limit(&self) -> &LimitState {
        &self.limit
    }

    /// Message of the most recent failed exchange.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn sessions(&self) -> &[SessionInfo] {
        self.registry.sessions()
    }

    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.registry.active_session()
    }

    pub fn active_session_id(&self) -> Option<&SessionId> {
        self.registry.active()
    }

    /// Transcript of the active session; empty when none is selected.
    pub fn active_log(&self) -> &[Turn] {
        self.registry
            .active()
            .and_then(|id| self.logs.get(id))
            .map(MessageLog::turns)
            .unwrap_or(&[])
    }

    pub fn log(&self, id: &SessionId) -> Option<&[Turn]> {
        self.logs.get(id).map(MessageLog::turns)
    }

    /// Session the in-flight exchange belongs to, if any.
    pub fn streaming_session(&self) -> Option<&SessionId> {
        self.in_flight.as_ref().map(|f| &f.session_id)
    }

    // -- session registry operations ----------------------------------------

    /// Fetch the session list from the backend, replacing the local one.
    pub async fn refresh_sessions(&mut self) -> Result<(), ChatError> {
        let sessions = self
            .backend
            .list_sessions()
            .await
            .map_err(into_unavailable)?;
        info!(count = sessions.len(), "sessions loaded");
        self.registry.replace(sessions);
        Ok(())
    }

    /// Create a session on the backend and make it active with an empty log.
    pub async fn create_session(&mut self, title_hint: &str) -> Result<SessionInfo, ChatError> {
        let session = self
            .backend
            .create_session(title_hint)
            .await
            .map_err(into_unavailable)?;
        info!(session = %session.id, title = %session.title, "session created");

        self.registry.prepend(session.clone());
        self.registry.select(&session.id);
        self.logs.insert(session.id.clone(), MessageLog::default());
        self.clear_limit();
        Ok(session)
    }

    /// Make `id` active and reload its transcript from the backend.
    ///
    /// The selection and limit reset apply even if the fetch fails. A
    /// transcript loaded earlier is then kept; a session that was never
    /// loaded stays without one until [`submit`](Self::submit) fetches it.
    pub async fn select_session(&mut self, id: &SessionId) -> Result<(), ChatError> {
        if !self.registry.select(id) {
            return Err(ChatError::UnknownSession(id.clone()));
        }
        self.clear_limit();
        debug!(session = %id, "session selected");
        self.load_log(id).await
    }

    async fn load_log(&mut self, id: &SessionId) -> Result<(), ChatError> {
        let turns = self
            .backend
            .session_messages(id)
            .await
            .map_err(into_unavailable)?;
        self.logs.entry(id.clone()).or_default().replace(turns);
        Ok(())
    }

    /// Delete a session on the backend, then locally. Deleting the active
    /// session selects the first remaining one; failing to load that
    /// session's transcript does not undo or fail the delete.
    pub async fn delete_session(&mut self, id: &SessionId) -> Result<(), ChatError> {
        if !self.registry.contains(id) {
            return Err(ChatError::UnknownSession(id.clone()));
        }
        self.backend
            .delete_session(id)
            .await
            .map_err(into_unavailable)?;
        info!(session = %id, "session deleted");

        self.logs.remove(id);
        self.titled.remove(id);
        match self.registry.remove(id) {
            Removal::ActiveReplaced(Some(next)) => {
                if let Err(e) = self.select_session(&next).await {
                    warn!(session = %next, error = %e, "could not load next session");
                }
            }
            Removal::ActiveReplaced(None) => self.clear_limit(),
            Removal::Removed | Removal::NotFound => {}
        }
        Ok(())
    }

    /// Rename on the backend, then locally. Renaming to the current title
    /// is harmless.
    pub async fn rename_session(&mut self, id: &SessionId, title: &str) -> Result<(), ChatError> {
        if !self.registry.contains(id) {
            return Err(ChatError::UnknownSession(id.clone()));
        }
        let session = self
            .backend
            .rename_session(id, title)
            .await
            .map_err(into_unavailable)?;
        self.registry.set_title(id, &session.title);
        Ok(())
    }

    // -- exchanges ------------------------------------------------------------

    /// Submit a user turn.
    ///
    /// Empty input, a busy client and a reached limit are rejected without
    /// side effects. With no active session one is created first. An active
    /// session whose transcript was never loaded is fetched first, so the
    /// request carries its history. If either call fails the error is
    /// returned and nothing is appended, so the caller still holds the
    /// typed text.
    pub async fn submit(&mut self, text: &str) -> Result<Submission, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Submission::Rejected(RejectReason::EmptyInput));
        }
        match self.state {
            ClientState::Idle | ClientState::Errored => {}
            ClientState::LimitReached => {
                return Ok(Submission::Rejected(RejectReason::LimitReached))
            }
            ClientState::AwaitingFirstFragment | ClientState::Streaming => {
                return Ok(Submission::Rejected(RejectReason::Busy))
            }
        }

        let session_id = match self.registry.active() {
            Some(id) => id.clone(),
            None => {
                let title = provisional_title(trimmed, self.title_prefix_chars);
                self.create_session(&title).await?.id
            }
        };

        if !self.logs.contains_key(&session_id) {
            self.load_log(&session_id).await?;
        }
        let log = self.logs.entry(session_id.clone()).or_default();
        let first_exchange = log.is_empty();
        log.begin_exchange(text);

        let request = ChatRequest {
            messages: log.history(),
            temperature: self.temperature,
            session_id: session_id.clone(),
        };

        self.exchange_seq += 1;
        let exchange = self.exchange_seq;
        self.in_flight = Some(InFlight {
            exchange,
            session_id: session_id.clone(),
            user_text: text.to_string(),
            first_exchange,
        });
        self.last_error = None;
        self.set_state(ClientState::AwaitingFirstFragment);

        spawn_exchange(
            Arc::clone(&self.backend),
            request,
            exchange,
            new_correlation_id(),
            self.events_tx.clone(),
        );
        Ok(Submission::Started(session_id))
    }

    /// Wait for the next background event and apply it. Returns `None`
    /// once nothing is outstanding.
    pub async fn next_update(&mut self) -> Option<ClientUpdate> {
        while self.in_flight.is_some() || self.pending_titles > 0 {
            let event = self.events_rx.recv().await?;
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
        None
    }

    /// Apply every event that has already arrived, without waiting.
    pub fn drain_updates(&mut self) -> Vec<ClientUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.extend(self.apply(event));
        }
        updates
    }

    /// Apply events until the in-flight exchange ends.
    pub async fn finish_exchange(&mut self) -> Vec<ClientUpdate> {
        let mut updates = Vec::new();
        while self.in_flight.is_some() {
            match self.next_update().await {
                Some(update) => updates.push(update),
                None => break,
            }
        }
        updates
    }

    fn apply(&mut self, event: ClientEvent) -> Option<ClientUpdate> {
        match event {
            ClientEvent::Fragment { exchange, fragment } => {
                let flight = self.in_flight.as_ref().filter(|f| f.exchange == exchange)?;
                let session_id = flight.session_id.clone();
                match self.logs.get_mut(&session_id) {
                    Some(log) => {
                        log.append_fragment(&fragment.text);
                    }
                    None => debug!(session = %session_id, "fragment for a deleted session"),
                }
                if self.state == ClientState::AwaitingFirstFragment {
                    self.set_state(ClientState::Streaming);
                }
                Some(ClientUpdate::Fragment {
                    session_id,
                    text: fragment.text,
                    cached: fragment.cached,
                })
            }
            ClientEvent::Finished { exchange, outcome } => {
                if self.in_flight.as_ref().map(|f| f.exchange) != Some(exchange) {
                    return None;
                }
                let flight = self.in_flight.take()?;
                Some(match outcome {
                    Ok(()) => self.complete_exchange(flight),
                    Err(error) => self.fail_exchange(flight, error),
                })
            }
            ClientEvent::TitleFinished { session_id, title } => {
                self.pending_titles = self.pending_titles.saturating_sub(1);
                let title = title?;
                if !self.registry.set_title(&session_id, &title) {
                    debug!(session = %session_id, "title for a deleted session");
                    return None;
                }
                info!(session = %session_id, title = %title, "session titled");
                Some(ClientUpdate::TitleUpdated { session_id, title })
            }
        }
    }

    fn complete_exchange(&mut self, flight: InFlight) -> ClientUpdate {
        if let Some(log) = self.logs.get_mut(&flight.session_id) {
            log.finish_exchange();
        }
        self.set_state(ClientState::Idle);

        let still_exists = self.registry.contains(&flight.session_id);
        if flight.first_exchange && still_exists && self.titled.insert(flight.session_id.clone())
        {
            self.pending_titles += 1;
            spawn_title_task(
                Arc::clone(&self.backend),
                flight.session_id.clone(),
                flight.user_text,
                self.events_tx.clone(),
            );
        }
        ClientUpdate::ExchangeCompleted {
            session_id: flight.session_id,
        }
    }

    fn fail_exchange(&mut self, flight: InFlight, error: ChatError) -> ClientUpdate {
        let session_id = flight.session_id;
        let log = self.logs.get_mut(&session_id);

        match &error {
            ChatError::QuotaExceeded(message) => {
                if let Some(log) = log {
                    log.abandon_exchange();
                }
                warn!(session = %session_id, message = %message, "quota reached");
                if self.registry.active() == Some(&session_id) {
                    self.limit = LimitState::reached(message.clone());
                    self.set_state(ClientState::LimitReached);
                } else {
                    self.set_state(ClientState::Idle);
                }
            }
            other => {
                let notice = match other {
                    ChatError::Authorization(detail) => detail.clone(),
                    ChatError::Generation(message) => format!("Error: {message}"),
                    _ => CONNECTIVITY_MESSAGE.to_string(),
                };
                warn!(session = %session_id, error = %other, "exchange failed");
                if let Some(log) = log {
                    log.abandon_exchange();
                    log.push_system(notice.clone());
                }
                self.last_error = Some(notice);
                self.set_state(ClientState::Errored);
                self.set_state(ClientState::Idle);
            }
        }

        ClientUpdate::ExchangeFailed { session_id, error }
    }

    fn clear_limit(&mut self) {
        self.limit = LimitState::default();
        if self.state == ClientState::LimitReached {
            self.set_state(ClientState::Idle);
        }
    }

    fn set_state(&mut self, next: ClientState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "client state");
            self.state = next;
        }
    }
}

/// Session CRUD failures all surface as `BackendUnavailable`.
fn into_unavailable(error: ChatError) -> ChatError {
    match error {
        ChatError::BackendUnavailable(_) => error,
        other => ChatError::BackendUnavailable(other.to_string()),
    }
}
