//! Per-channel conversation log used as the language-model context window.
//!
//! Ephemeral by design: the log lives in process memory and is lost on
//! restart, which only costs conversational context — staff can re-engage.
//! System instructions are never stored here; they are injected per call.

use serde::{Deserialize, Serialize};

/// Who produced a turn. No system role — see module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One normalized, role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered history of turns for one channel.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_tail_in_order() {
        let mut log = ConversationLog::new();
        for i in 0..8 {
            log.push(Turn::user(format!("msg {i}")));
        }
        let recent = log.recent(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "msg 2");
        assert_eq!(recent[5].content, "msg 7");
    }

    #[test]
    fn recent_handles_short_logs() {
        let mut log = ConversationLog::new();
        log.push(Turn::assistant("hello"));
        assert_eq!(log.recent(10).len(), 1);
        assert_eq!(ConversationLog::new().recent(6).len(), 0);
    }
}
