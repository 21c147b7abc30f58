//! Context builder for assembling prompts

use chat_relay_core::session::{Role, Turn};
use chat_relay_providers::Message;
use std::path::Path;
use tracing::{debug, warn};

/// Instruction used when no prompt file is available
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and helpful conversational assistant. \
Answer clearly and concisely, keep a warm tone, and ask a follow-up question when the user's \
request is ambiguous.";

/// Builds the message list for LLM requests
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    /// Create a context builder with an explicit system instruction
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Create a context builder whose instruction is read from `path`
    pub fn from_prompt_file<P: AsRef<Path>>(path: P) -> Self {
        Self::new(load_system_prompt(path.as_ref()))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the complete message list for an LLM call:
    /// system instruction, then history in order, then the new user turn.
    pub fn build_messages(&self, history: &[Turn], current_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.system_prompt));

        for turn in history {
            if turn.role == Role::System {
                continue;
            }
            messages.push(Message::from(turn));
        }

        messages.push(Message::user(current_message));
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Read the system instruction, falling back to [`DEFAULT_SYSTEM_PROMPT`]
/// when the file is missing, unreadable or blank.
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let content = content.trim();
            if content.is_empty() {
                warn!(path = %path.display(), "Prompt file is empty, using default instruction");
                DEFAULT_SYSTEM_PROMPT.to_string()
            } else {
                debug!(path = %path.display(), chars = content.len(), "Loaded system prompt");
                content.to_string()
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No prompt file, using default instruction");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read prompt file, using default instruction");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}
