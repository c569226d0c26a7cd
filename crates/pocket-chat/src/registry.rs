//! Ordered session list and the active selection.
//!
//! Pure in-memory bookkeeping; the backend calls that feed it live on
//! [`crate::SessionClient`].

use crate::backend::SessionInfo;
use crate::SessionId;

/// Result of removing a session from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    NotFound,
    /// An inactive session was removed; the selection is unchanged.
    Removed,
    /// The active session was removed; carries the new selection.
    ActiveReplaced(Option<SessionId>),
}

/// Sessions ordered most recent first.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Vec<SessionInfo>,
    active: Option<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[SessionInfo] {
        &self.sessions
    }

    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &SessionId) -> Option<&SessionInfo> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.get(id).is_some()
    }

    /// Replace the list with a fresh backend listing. The selection is kept
    /// only if the session still exists.
    pub fn replace(&mut self, sessions: Vec<SessionInfo>) {
        self.sessions = sessions;
        if let Some(active) = &self.active {
            if !self.contains(active) {
                self.active = None;
            }
        }
    }

    pub fn prepend(&mut self, session: SessionInfo) {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
    }

    /// Remove a session. Removing the active one selects the first
    /// remaining session, or nothing when none remain.
    pub fn remove(&mut self, id: &SessionId) -> Removal {
        let Some(pos) = self.sessions.iter().position(|s| &s.id == id) else {
            return Removal::NotFound;
        };
        self.sessions.remove(pos);

        if self.active.as_ref() == Some(id) {
            self.active = self.sessions.first().map(|s| s.id.clone());
            Removal::ActiveReplaced(self.active.clone())
        } else {
            Removal::Removed
        }
    }

    /// Make `id` active. Returns false for an unknown id.
    pub fn select(&mut self, id: &SessionId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Returns false when no session has this id.
    pub fn set_title(&mut self, id: &SessionId, title: &str) -> bool {
        match self.sessions.iter_mut().find(|s| &s.id == id) {
            Some(session) => {
                session.title = title.to_string();
                true
            }
            None => false,
        }
    }
}
