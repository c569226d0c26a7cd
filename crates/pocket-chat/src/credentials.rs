//! Credential context shared by every backend call.
//!
//! Holds the bearer token and role tag under fixed keys. Both are set on
//! login and cleared together on logout. Cloning the context yields a
//! handle to the same store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::backend::Backend;
use crate::ChatError;

pub const TOKEN_KEY: &str = "pocketllm_token";
pub const ROLE_KEY: &str = "pocketllm_role";

/// Which surface a login grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Default)]
pub struct CredentialContext {
    store: Arc<RwLock<HashMap<&'static str, String>>>,
}

impl CredentialContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token and role together.
    pub fn set(&self, token: impl Into<String>, role: UserRole) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.insert(TOKEN_KEY, token.into());
        store.insert(ROLE_KEY, role.as_str().to_string());
    }

    /// Forget the token and role.
    pub fn logout(&self) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.remove(TOKEN_KEY);
        store.remove(ROLE_KEY);
        info!("credentials cleared");
    }

    pub fn bearer(&self) -> Option<String> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.get(TOKEN_KEY).cloned()
    }

    pub fn role(&self) -> Option<UserRole> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.get(ROLE_KEY).and_then(|r| r.parse().ok())
    }

    pub fn is_authenticated(&self) -> bool {
        self.role().is_some()
    }

    /// Fail with `Forbidden` unless the stored role is `required`.
    pub fn require_role(&self, required: UserRole) -> Result<(), ChatError> {
        match self.role() {
            Some(role) if role == required => Ok(()),
            Some(role) => Err(ChatError::Forbidden(format!(
                "{} access required, logged in as {}",
                required.as_str(),
                role.as_str()
            ))),
            None => Err(ChatError::Forbidden("not logged in".into())),
        }
    }
}

impl fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.bearer().map(|_| "[REDACTED]");
        f.debug_struct("CredentialContext")
            .field("token", &token)
            .field("role", &self.role())
            .finish()
    }
}

/// Exchange username/password for a bearer token and store it with `role`.
pub async fn login(
    backend: &dyn Backend,
    credentials: &CredentialContext,
    username: &str,
    password: &str,
    role: UserRole,
) -> Result<(), ChatError> {
    let token = backend.login(username, password).await?;
    credentials.set(token.access_token, role);
    info!(username, role = role.as_str(), "logged in");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_logout_move_together() {
        let creds = CredentialContext::new();
        assert!(!creds.is_authenticated());
        assert_eq!(creds.bearer(), None);

        creds.set("tok-1", UserRole::User);
        assert_eq!(creds.bearer().as_deref(), Some("tok-1"));
        assert_eq!(creds.role(), Some(UserRole::User));

        creds.logout();
        assert_eq!(creds.bearer(), None);
        assert_eq!(creds.role(), None);
    }

    #[test]
    fn clones_share_the_store() {
        let creds = CredentialContext::new();
        let handle = creds.clone();
        creds.set("tok-2", UserRole::Admin);
        assert_eq!(handle.bearer().as_deref(), Some("tok-2"));
        handle.logout();
        assert!(!creds.is_authenticated());
    }

    #[test]
    fn require_role_checks_tag() {
        let creds = CredentialContext::new();
        assert!(matches!(
            creds.require_role(UserRole::Admin),
            Err(ChatError::Forbidden(_))
        ));

        creds.set("t", UserRole::User);
        let err = creds.require_role(UserRole::Admin).unwrap_err();
        assert!(err.to_string().contains("logged in as user"));

        creds.set("t", UserRole::Admin);
        assert!(creds.require_role(UserRole::Admin).is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let creds = CredentialContext::new();
        creds.set("super-secret", UserRole::User);
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn role_parses() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("root".parse::<UserRole>().is_err());
    }
}
