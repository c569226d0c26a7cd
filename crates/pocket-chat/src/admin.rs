//! Operator endpoints under `/admin`. Only reachable with an admin login.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::credentials::UserRole;
use crate::http::HttpBackend;
use crate::ChatError;

/// Host resource usage as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

/// Response cache occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheStats {
    pub size_bytes: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLimits {
    /// Prompts allowed per session before the backend answers with a quota
    /// rejection.
    pub max_prompts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSessionLimits {
    pub max_cached_sessions: u32,
}

/// Model files the backend can load, and the one it is serving.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub current_model: String,
}

#[derive(Debug, Serialize)]
struct ModelSelection<'a> {
    model_filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    #[serde(default)]
    status: Option<String>,
}

/// Borrowed view over an [`HttpBackend`] that passed the admin role check.
pub struct AdminApi<'a> {
    backend: &'a HttpBackend,
}

impl HttpBackend {
    /// Admin endpoints, or `Forbidden` unless logged in as admin.
    pub fn admin(&self) -> Result<AdminApi<'_>, ChatError> {
        self.credentials().require_role(UserRole::Admin)?;
        Ok(AdminApi { backend: self })
    }
}

impl AdminApi<'_> {
    pub async fn system_stats(&self) -> Result<SystemStats, ChatError> {
        debug!("GET /admin/system-stats");
        let b = self.backend;
        b.call_json(b.request(Method::GET, "/admin/system-stats"), "system stats")
            .await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, ChatError> {
        debug!("GET /admin/cache-stats");
        let b = self.backend;
        b.call_json(b.request(Method::GET, "/admin/cache-stats"), "cache stats")
            .await
    }

    /// Drop every cached reply. Returns the backend's status line.
    pub async fn clear_cache(&self) -> Result<String, ChatError> {
        let b = self.backend;
        let reply: StatusReply = b
            .call_json(b.request(Method::POST, "/admin/clear-cache"), "clear cache")
            .await?;
        info!("response cache cleared");
        Ok(reply.status.unwrap_or_else(|| "Cache cleared".into()))
    }

    pub async fn models(&self) -> Result<ModelList, ChatError> {
        debug!("GET /admin/models");
        let b = self.backend;
        b.call_json(b.request(Method::GET, "/admin/models"), "models")
            .await
    }

    /// Switch the served model to `model_filename`, one of [`ModelList::models`].
    pub async fn select_model(&self, model_filename: &str) -> Result<(), ChatError> {
        let b = self.backend;
        let builder = b
            .request(Method::POST, "/admin/models/select")
            .json(&ModelSelection { model_filename });
        b.send_bounded(builder, "select model").await?;
        info!(model = %model_filename, "model selected");
        Ok(())
    }

    pub async fn session_limits(&self) -> Result<SessionLimits, ChatError> {
        let b = self.backend;
        b.call_json(b.request(Method::GET, "/admin/session-config"), "session config")
            .await
    }

    pub async fn set_session_limits(&self, limits: SessionLimits) -> Result<(), ChatError> {
        let b = self.backend;
        let builder = b.request(Method::POST, "/admin/session-config").json(&limits);
        b.send_bounded(builder, "set session config").await?;
        info!(max_prompts = limits.max_prompts, "session limit updated");
        Ok(())
    }

    pub async fn cache_session_limits(&self) -> Result<CacheSessionLimits, ChatError> {
        let b = self.backend;
        b.call_json(
            b.request(Method::GET, "/admin/cache-session-config"),
            "cache session config",
        )
        .await
    }

    pub async fn set_cache_session_limits(
        &self,
        limits: CacheSessionLimits,
    ) -> Result<(), ChatError> {
        let b = self.backend;
        let builder = b
            .request(Method::POST, "/admin/cache-session-config")
            .json(&limits);
        b.send_bounded(builder, "set cache session config").await?;
        info!(
            max_cached_sessions = limits.max_cached_sessions,
            "cached session limit updated"
        );
        Ok(())
    }
}
