//! Builds conversation agents from configuration

use chat_relay_core::config::Config;
use chat_relay_core::session::SessionStore;
use chat_relay_core::{Error, Result};
use chat_relay_providers::{HuggingFaceClient, LLMProvider, ProviderError};
use std::sync::Arc;
use tracing::debug;

use crate::agent::{AgentSettings, ConversationAgent};
use crate::context::ContextBuilder;

/// Builds [`ConversationAgent`]s that share one session store.
///
/// The system prompt is read once when the factory is created. Agents built
/// with a per-request token are scoped to that token and share the store,
/// so no shared state changes when a caller brings its own credential.
pub struct AgentFactory {
    config: Config,
    sessions: Arc<SessionStore>,
    context: ContextBuilder,
}

impl AgentFactory {
    /// Create a factory, loading the system prompt from the configured file
    pub fn new(config: Config, sessions: Arc<SessionStore>) -> Self {
        let context = ContextBuilder::from_prompt_file(&config.agent.prompt_file);
        Self::with_context(config, sessions, context)
    }

    /// Create a factory with an explicit context builder
    pub fn with_context(config: Config, sessions: Arc<SessionStore>, context: ContextBuilder) -> Self {
        Self {
            config,
            sessions,
            context,
        }
    }

    /// Build an agent talking to the configured Hugging Face backend.
    ///
    /// `api_key_override` takes precedence over the configured token.
    /// Having no token at all is a configuration error.
    pub fn build(&self, api_key_override: Option<&str>) -> Result<ConversationAgent> {
        let client = HuggingFaceClient::from_config(&self.config.provider, api_key_override)
            .map_err(|e| match e {
                ProviderError::ConfigError(msg) => Error::Config(msg),
                other => Error::Provider(other.to_string()),
            })?;

        debug!(
            model = %self.config.provider.model,
            api_base = client.api_base(),
            per_request_token = api_key_override.is_some(),
            "Built conversation agent"
        );

        Ok(self.with_provider(Arc::new(client)))
    }

    /// Build an agent around an arbitrary provider
    pub fn with_provider(&self, provider: Arc<dyn LLMProvider>) -> ConversationAgent {
        ConversationAgent::new(
            provider,
            self.sessions.clone(),
            self.context.clone(),
            AgentSettings::from_config(&self.config),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn model(&self) -> &str {
        &self.config.provider.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEFAULT_SYSTEM_PROMPT;
    use tempfile::TempDir;

    #[test]
    fn test_build_without_token_is_config_error() {
        let factory = AgentFactory::new(Config::default(), Arc::new(SessionStore::new()));
        let err = factory.build(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("HF_API_TOKEN"));
    }

    #[test]
    fn test_request_token_scopes_new_agent_over_shared_store() {
        let sessions = Arc::new(SessionStore::new());
        let factory = AgentFactory::new(Config::default(), sessions.clone());

        let agent = factory.build(Some("hf_request")).unwrap();
        assert!(Arc::ptr_eq(agent.sessions(), &sessions));
        assert_eq!(agent.model(), Config::default().provider.model);
    }

    #[test]
    fn test_prompt_loaded_from_configured_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prompt.txt");
        std::fs::write(&path, "You are Ada.").unwrap();

        let mut config = Config::default();
        config.provider.api_key = "hf_config".to_string();
        config.agent.prompt_file = path.to_string_lossy().to_string();

        let factory = AgentFactory::new(config, Arc::new(SessionStore::new()));
        let agent = factory.build(None).unwrap();
        assert_eq!(agent.system_prompt(), "You are Ada.");
    }

    #[test]
    fn test_missing_prompt_file_uses_default() {
        let mut config = Config::default();
        config.agent.prompt_file = "/nonexistent/prompt.txt".to_string();

        let factory = AgentFactory::new(config, Arc::new(SessionStore::new()));
        let agent = factory.build(Some("hf_x")).unwrap();
        assert_eq!(agent.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
