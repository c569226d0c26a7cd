//! Per-session ordered transcript.

use crate::{Role, Turn};

/// Ordered turns of one session.
///
/// During an exchange the log holds a user turn followed by an assistant
/// placeholder that fragments are appended to. The placeholder is tracked
/// by index and is never replaced or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    turns: Vec<Turn>,
    streaming: Option<usize>,
}

impl MessageLog {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            streaming: None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Replace the log with turns fetched from the backend.
    ///
    /// An in-flight user turn and placeholder survive the replacement so
    /// the exchange keeps its append target. The user turn is not repeated
    /// if the backend already returned it.
    pub fn replace(&mut self, fetched: Vec<Turn>) {
        let in_flight = self
            .streaming
            .filter(|&idx| idx >= 1)
            .map(|idx| (self.turns[idx - 1].clone(), self.turns[idx].clone()));

        self.turns = fetched;
        self.streaming = None;

        if let Some((user, placeholder)) = in_flight {
            if self.turns.last() != Some(&user) {
                self.turns.push(user);
            }
            self.turns.push(placeholder);
            self.streaming = Some(self.turns.len() - 1);
        }
    }

    /// Append the user turn and an empty assistant placeholder.
    pub fn begin_exchange(&mut self, user_text: &str) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(String::new()));
        self.streaming = Some(self.turns.len() - 1);
    }

    /// Append decoded text to the placeholder. Returns false when no
    /// exchange is in progress.
    pub fn append_fragment(&mut self, text: &str) -> bool {
        match self.streaming.and_then(|idx| self.turns.get_mut(idx)) {
            Some(turn) => {
                turn.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// The exchange completed; the placeholder becomes an ordinary turn.
    pub fn finish_exchange(&mut self) {
        self.streaming = None;
    }

    /// The exchange failed; drop the placeholder if nothing was streamed
    /// into it. The user turn stays.
    pub fn abandon_exchange(&mut self) {
        if let Some(idx) = self.streaming.take() {
            if self.turns.get(idx).is_some_and(|t| t.content.is_empty()) {
                self.turns.remove(idx);
            }
        }
    }

    pub fn push_system(&mut self, message: impl Into<String>) {
        self.turns.push(Turn::system(message));
    }

    /// Turns to send as conversation history: user and assistant turns,
    /// excluding the in-progress placeholder and local system notices.
    pub fn history(&self) -> Vec<Turn> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(idx, turn)| Some(*idx) != self.streaming && turn.role != Role::System)
            .map(|(_, turn)| turn.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_appends_in_order() {
        let mut log = MessageLog::default();
        log.begin_exchange("Hello");
        assert!(log.append_fragment("Hi"));
        assert!(log.append_fragment(" there"));
        log.finish_exchange();

        assert_eq!(
            log.turns(),
            &[Turn::user("Hello"), Turn::assistant("Hi there")]
        );
        assert!(!log.append_fragment("late"));
    }

    #[test]
    fn history_excludes_placeholder_and_system_turns() {
        let mut log = MessageLog::new(vec![Turn::user("a"), Turn::assistant("b")]);
        log.push_system("invalid token");
        log.begin_exchange("c");

        assert_eq!(
            log.history(),
            vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")]
        );
    }

    #[test]
    fn abandon_removes_only_empty_placeholder() {
        let mut log = MessageLog::default();
        log.begin_exchange("one");
        log.abandon_exchange();
        assert_eq!(log.turns(), &[Turn::user("one")]);

        log.begin_exchange("two");
        log.append_fragment("partial");
        log.abandon_exchange();
        assert_eq!(log.turns().last(), Some(&Turn::assistant("partial")));
        assert!(!log.is_streaming());
    }

    #[test]
    fn replace_without_exchange_is_wholesale() {
        let mut log = MessageLog::new(vec![Turn::user("stale")]);
        log.replace(vec![Turn::user("x"), Turn::assistant("y")]);
        assert_eq!(log.turns(), &[Turn::user("x"), Turn::assistant("y")]);

        let once = log.clone();
        log.replace(vec![Turn::user("x"), Turn::assistant("y")]);
        assert_eq!(log, once);
    }

    #[test]
    fn replace_keeps_in_flight_exchange() {
        let mut log = MessageLog::default();
        log.begin_exchange("question");
        log.append_fragment("ans");

        log.replace(vec![Turn::user("older"), Turn::assistant("reply")]);
        log.append_fragment("wer");

        assert_eq!(
            log.turns(),
            &[
                Turn::user("older"),
                Turn::assistant("reply"),
                Turn::user("question"),
                Turn::assistant("answer"),
            ]
        );
    }

    #[test]
    fn replace_does_not_duplicate_persisted_user_turn() {
        let mut log = MessageLog::default();
        log.begin_exchange("question");

        log.replace(vec![Turn::user("question")]);
        log.append_fragment("a");

        assert_eq!(
            log.turns(),
            &[Turn::user("question"), Turn::assistant("a")]
        );
    }
}
