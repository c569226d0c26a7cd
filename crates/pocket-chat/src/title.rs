//! Session titles: a provisional one cut from the first message, and a
//! generated one requested after the first exchange completes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::client::events::ClientEvent;
use crate::SessionId;

/// First `max_chars` characters of the trimmed input, with `...` appended
/// when it was cut.
pub fn provisional_title(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Ask the backend for a title in the background. Failure is logged and
/// reported as `None`; it never touches the transcript. A task that dies
/// still reports `None` so the client stops waiting for it.
pub(crate) fn spawn_title_task(
    backend: Arc<dyn Backend>,
    session_id: SessionId,
    user_message: String,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let watched_id = session_id.clone();
    let task_events = events.clone();
    let handle = tokio::spawn(async move {
        let title = match backend.generate_title(&session_id, &user_message).await {
            Ok(session) if session.id == session_id => {
                debug!(session = %session_id, title = %session.title, "title generated");
                Some(session.title)
            }
            Ok(session) => {
                warn!(
                    session = %session_id,
                    returned = %session.id,
                    "title response for a different session"
                );
                None
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "title generation failed");
                None
            }
        };
        let _ = task_events.send(ClientEvent::TitleFinished { session_id, title });
    });

    tokio::spawn(async move {
        if let Err(e) = handle.await {
            warn!(session = %watched_id, error = %e, "title task died");
            let _ = events.send(ClientEvent::TitleFinished {
                session_id: watched_id,
                title: None,
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_kept() {
        assert_eq!(provisional_title("Hello", 30), "Hello");
        assert_eq!(provisional_title("  Hello  ", 30), "Hello");
    }

    #[test]
    fn long_input_is_cut_with_ellipsis() {
        let title = provisional_title("Explain the borrow checker to me please", 19);
        assert_eq!(title, "Explain the borrow...");
    }

    #[test]
    fn exact_length_is_not_cut() {
        assert_eq!(provisional_title("abcde", 5), "abcde");
    }

    #[test]
    fn cuts_on_char_boundaries() {
        assert_eq!(provisional_title("日本語のテキスト", 3), "日本語...");
    }
}
