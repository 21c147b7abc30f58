//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Session key used when the caller does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Message role (user, assistant, system)
    pub role: Role,
    /// Message content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session key
    pub key: String,
    /// Chronological turns, never containing a system turn
    messages: Vec<Turn>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append turns in order. System turns are dropped.
    pub fn append<I>(&mut self, turns: I)
    where
        I: IntoIterator<Item = Turn>,
    {
        let before = self.messages.len();
        for turn in turns {
            if turn.role == Role::System {
                warn!(session_id = %self.key, "Refusing to store system turn in session history");
                continue;
            }
            self.messages.push(turn);
        }
        if self.messages.len() != before {
            self.updated_at = Utc::now();
        }
    }

    /// Record one completed exchange as a user turn followed by an assistant turn
    pub fn record_exchange(&mut self, user_message: impl Into<String>, reply: impl Into<String>) {
        self.append([Turn::user(user_message), Turn::assistant(reply)]);
    }

    /// Get the full history
    pub fn history(&self) -> &[Turn] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.messages.clear();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("s1");
        assert_eq!(session.key, "s1");
        assert!(session.is_empty());
    }

    #[test]
    fn test_record_exchange_orders_user_then_assistant() {
        let mut session = Session::new("test");
        session.record_exchange("Hello", "Hi there!");

        assert_eq!(session.len(), 2);
        assert_eq!(session.history()[0].role, Role::User);
        assert_eq!(session.history()[0].content, "Hello");
        assert_eq!(session.history()[1].role, Role::Assistant);
        assert_eq!(session.history()[1].content, "Hi there!");
    }

    #[test]
    fn test_append_drops_system_turns() {
        let mut session = Session::new("test");
        session.append([
            Turn::system("You are helpful"),
            Turn::user("hey"),
            Turn::assistant("hello"),
        ]);

        assert_eq!(session.len(), 2);
        assert!(session.history().iter().all(|t| t.role != Role::System));
    }

    #[test]
    fn test_clear() {
        let mut session = Session::new("test");
        session.record_exchange("a", "b");
        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::User.to_string(), "user");
    }
}
