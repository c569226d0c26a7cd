use serde::{Deserialize, Serialize};

/// Chat defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Sampling temperature sent with every turn (valid range: 0.0-2.0).
    pub temperature: f64,
    /// Characters of the first message used as a provisional session
    /// title (valid range: 1-200).
    pub title_prefix_chars: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            title_prefix_chars: 30,
        }
    }
}
