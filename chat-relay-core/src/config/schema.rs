//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reply returned to callers whenever the inference backend fails
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, something went wrong on my end. Let's try again.";

/// Root configuration for chat-relay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Inference provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Conversation agent configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wire format spoken to the inference backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// OpenAI-compatible `/chat/completions`
    #[default]
    ChatCompletions,
    /// Raw text-generation task (`/models/{model}`)
    TextGeneration,
}

/// Inference provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Access token; empty means "not configured"
    #[serde(default)]
    pub api_key: String,
    /// Override for the backend base URL
    #[serde(default)]
    pub api_base: Option<String>,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_style: ApiStyle,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "meta-llama/Llama-3.1-8B-Instruct".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    /// Access token, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            api_style: ApiStyle::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Text file holding the system instruction
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
    /// Reply returned when the backend fails
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    /// Sampling parameters sent with every request
    #[serde(default)]
    pub sampling: SamplingConfig,
}

fn default_prompt_file() -> String {
    "prompt.txt".to_string()
}

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prompt_file: default_prompt_file(),
            fallback_reply: default_fallback_reply(),
            sampling: SamplingConfig::default(),
        }
    }
}

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub max_new_tokens: u32,
    /// Only honoured by backends that support it
    pub repetition_penalty: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.95,
            top_p: 0.9,
            max_new_tokens: 350,
            repetition_penalty: 1.1,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sampling_parameters() {
        let sampling = SamplingConfig::default();
        assert_eq!(sampling.temperature, 0.95);
        assert_eq!(sampling.top_p, 0.9);
        assert_eq!(sampling.max_new_tokens, 350);
        assert_eq!(sampling.repetition_penalty, 1.1);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider":{"model":"org/model"}}"#).unwrap();
        assert_eq!(config.provider.model, "org/model");
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.agent.prompt_file, "prompt.txt");
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut provider = ProviderConfig::default();
        assert_eq!(provider.api_key(), None);
        provider.api_key = "  ".to_string();
        assert_eq!(provider.api_key(), None);
        provider.api_key = "hf_abc".to_string();
        assert_eq!(provider.api_key(), Some("hf_abc"));
    }

    #[test]
    fn test_api_style_snake_case() {
        let style: ApiStyle = serde_json::from_str("\"text_generation\"").unwrap();
        assert_eq!(style, ApiStyle::TextGeneration);
    }
}
