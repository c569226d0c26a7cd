use serde::{Deserialize, Serialize};

/// Where the inference backend lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL without trailing slash, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// TCP connect timeout in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// Whole-request timeout for non-streaming calls (valid range: 1-600).
    /// Streaming replies rely on the transport's own behavior.
    pub request_timeout_secs: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}
