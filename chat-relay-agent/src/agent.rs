//! Conversation agent: one chat exchange per call

use chat_relay_core::config::{Config, SamplingConfig};
use chat_relay_core::session::{SessionStore, Turn};
use chat_relay_providers::{FailureReason, GenerationOutcome, LLMProvider};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::context::ContextBuilder;

/// Per-agent settings fixed at construction
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model identifier sent to the provider
    pub model: String,
    pub sampling: SamplingConfig,
    /// Reply returned when the backend fails
    pub fallback_reply: String,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.provider.model.clone(),
            sampling: config.agent.sampling,
            fallback_reply: config.agent.fallback_reply.clone(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What one exchange produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The backend replied and the exchange was recorded
    Reply(String),
    /// The backend failed; history is untouched
    Fallback {
        reply: String,
        reason: FailureReason,
    },
}

impl ChatOutcome {
    /// The text shown to the user
    pub fn into_text(self) -> String {
        match self {
            ChatOutcome::Reply(text) => text,
            ChatOutcome::Fallback { reply, .. } => reply,
        }
    }
}

/// Drives chat exchanges for any number of sessions against one provider
pub struct ConversationAgent {
    provider: Arc<dyn LLMProvider>,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
    settings: AgentSettings,
}

impl ConversationAgent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        sessions: Arc<SessionStore>,
        context: ContextBuilder,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            sessions,
            context,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn system_prompt(&self) -> &str {
        self.context.system_prompt()
    }

    /// Run one exchange and return the text for the user.
    ///
    /// Never fails: backend errors yield the fallback reply.
    pub async fn chat(&self, session_id: &str, user_message: &str) -> String {
        self.exchange(session_id, user_message).await.into_text()
    }

    /// Run one exchange and return the typed outcome.
    ///
    /// The session lock is held from reading history until the exchange is
    /// recorded, so exchanges on one session never interleave. Both turns
    /// are appended in one step after the provider returns; dropping this
    /// future early leaves the history as it was.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn exchange(&self, session_id: &str, user_message: &str) -> ChatOutcome {
        let handle = self.sessions.get_or_create(session_id);
        let mut session = handle.lock().await;

        let messages = self.context.build_messages(session.history(), user_message);
        debug!(
            session_id = session_id,
            model = %self.settings.model,
            messages = messages.len(),
            "Dispatching chat request"
        );

        let result = self
            .provider
            .chat(
                messages,
                Some(self.settings.model.clone()),
                &self.settings.sampling,
            )
            .await;

        match GenerationOutcome::from(result) {
            GenerationOutcome::Success(reply) => {
                session.record_exchange(user_message, reply.clone());
                info!(
                    session_id = session_id,
                    history_len = session.len(),
                    "Chat exchange recorded"
                );
                ChatOutcome::Reply(reply)
            }
            GenerationOutcome::Failure(reason) => {
                error!(
                    session_id = session_id,
                    kind = %reason.kind,
                    error = %reason.message,
                    "Chat backend call failed"
                );
                ChatOutcome::Fallback {
                    reply: self.settings.fallback_reply.clone(),
                    reason,
                }
            }
        }
    }

    /// Reset a session's history. Unknown sessions are ignored.
    pub async fn clear_memory(&self, session_id: &str) {
        if self.sessions.clear(session_id).await {
            info!(session_id = session_id, "Session memory cleared");
        }
    }

    /// Snapshot of a session's history
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.history(session_id).await
    }
}

impl std::fmt::Debug for ConversationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationAgent")
            .field("model", &self.settings.model)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
