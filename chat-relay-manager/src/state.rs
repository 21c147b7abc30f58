use chat_relay_agent::{AgentFactory, ConversationAgent};
use chat_relay_core::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<AgentFactory>,
    /// Agent built from the process configuration; absent when no token is
    /// configured, in which case every request must bring its own.
    pub default_agent: Option<Arc<ConversationAgent>>,
}

impl AppState {
    pub fn new(factory: Arc<AgentFactory>, default_agent: Option<Arc<ConversationAgent>>) -> Self {
        Self {
            factory,
            default_agent,
        }
    }

    /// Build state from a factory, creating the default agent if possible
    pub fn from_factory(factory: AgentFactory) -> Self {
        let default_agent = match factory.build(None) {
            Ok(agent) => Some(Arc::new(agent)),
            Err(e) => {
                warn!(error = %e, "No default agent; requests must supply hf_token");
                None
            }
        };
        Self::new(Arc::new(factory), default_agent)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.factory.sessions()
    }

    /// Agent for one request. A request token gets its own agent over the
    /// shared session store; otherwise the default agent is used.
    pub fn agent_for(&self, hf_token: Option<&str>) -> chat_relay_core::Result<Arc<ConversationAgent>> {
        if let Some(token) = hf_token.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Arc::new(self.factory.build(Some(token))?));
        }
        match &self.default_agent {
            Some(agent) => Ok(agent.clone()),
            None => Err(chat_relay_core::Error::Config(
                "HF_API_TOKEN not set".to_string(),
            )),
        }
    }

    /// Drop a session and its history
    pub fn delete_session(&self, session_id: &str) -> chat_relay_core::Result<()> {
        if self.sessions().remove(session_id) {
            Ok(())
        } else {
            Err(chat_relay_core::Error::SessionNotFound(session_id.to_string()))
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub hf_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
}

/// Body of `POST /clear`
#[derive(Debug, Clone, Default)]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}
