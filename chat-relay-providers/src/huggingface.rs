//! Hugging Face inference client

use async_trait::async_trait;
use chat_relay_core::config::{ApiStyle, ProviderConfig, SamplingConfig};
use chat_relay_core::session::Role;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};

/// Router endpoint speaking the OpenAI chat-completions format
pub const DEFAULT_CHAT_API_BASE: &str = "https://router.huggingface.co/v1";

/// Serverless inference endpoint for the raw text-generation task
pub const DEFAULT_TEXT_GENERATION_API_BASE: &str = "https://api-inference.huggingface.co";

/// Chat completions request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

/// Chat completions response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

/// Text-generation request format
#[derive(Debug, Serialize)]
struct TextGenerationRequest {
    inputs: String,
    parameters: TextGenerationParameters,
    options: TextGenerationOptions,
}

#[derive(Debug, Serialize)]
struct TextGenerationParameters {
    max_new_tokens: u32,
    temperature: f64,
    top_p: f64,
    repetition_penalty: f64,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct TextGenerationOptions {
    wait_for_model: bool,
}

/// The endpoint answers with either a list or a single object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextGenerationResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: Option<String>,
}

/// Hugging Face provider client
pub struct HuggingFaceClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    api_style: ApiStyle,
}

impl HuggingFaceClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: Option<String>,
        default_model: String,
        api_style: ApiStyle,
        timeout: Duration,
    ) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| match api_style {
                ApiStyle::ChatCompletions => DEFAULT_CHAT_API_BASE.to_string(),
                ApiStyle::TextGeneration => DEFAULT_TEXT_GENERATION_API_BASE.to_string(),
            });

        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            api_key,
            default_model,
            api_style,
        }
    }

    /// Build a client from configuration. `api_key_override` wins over the
    /// configured token; having neither is a configuration error.
    pub fn from_config(
        config: &ProviderConfig,
        api_key_override: Option<&str>,
    ) -> ProviderResult<Self> {
        let api_key = api_key_override
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .or_else(|| config.api_key())
            .ok_or_else(|| ProviderError::ConfigError("HF_API_TOKEN not set".to_string()))?;

        if config.model.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "model identifier not set".to_string(),
            ));
        }

        Ok(Self::new(
            Some(api_key.to_string()),
            config.api_base.clone(),
            config.model.clone(),
            config.api_style,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }
        req_builder
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, req_builder: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = self.apply_headers(req_builder).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }

    async fn chat_completions(
        &self,
        messages: &[Message],
        model: &str,
        sampling: &SamplingConfig,
    ) -> ProviderResult<LLMResponse> {
        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: sampling.max_new_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };

        let url = format!("{}/chat/completions", self.api_base);
        debug!(url = %url, model = model, messages = messages.len(), "Sending chat request");

        let body = self.send(self.client.post(&url).json(&request)).await?;
        let response: ChatCompletionResponse = serde_json::from_str(&body)?;
        Self::parse_chat_response(response)
    }

    async fn text_generation(
        &self,
        messages: &[Message],
        model: &str,
        sampling: &SamplingConfig,
    ) -> ProviderResult<LLMResponse> {
        let request = TextGenerationRequest {
            inputs: render_prompt(messages),
            parameters: TextGenerationParameters {
                max_new_tokens: sampling.max_new_tokens,
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                repetition_penalty: sampling.repetition_penalty,
                return_full_text: false,
            },
            options: TextGenerationOptions {
                wait_for_model: true,
            },
        };

        let url = format!("{}/models/{}", self.api_base, model);
        debug!(url = %url, model = model, "Sending text-generation request");

        let body = self.send(self.client.post(&url).json(&request)).await?;
        let response: TextGenerationResponse = serde_json::from_str(&body)?;
        Self::parse_text_generation_response(response)
    }

    fn parse_chat_response(response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), response.usage.prompt_tokens);
        usage.insert(
            "completion_tokens".to_string(),
            response.usage.completion_tokens,
        );
        usage.insert("total_tokens".to_string(), response.usage.total_tokens);

        Ok(LLMResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }

    fn parse_text_generation_response(
        response: TextGenerationResponse,
    ) -> ProviderResult<LLMResponse> {
        let generated = match response {
            TextGenerationResponse::Many(items) => items.into_iter().next().ok_or_else(|| {
                ProviderError::InvalidResponse("No generations in response".to_string())
            })?,
            TextGenerationResponse::One(item) => item,
        };

        Ok(LLMResponse {
            content: generated.generated_text,
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        })
    }
}

/// Render a message list into a single prompt using role tags, ending with
/// an open assistant tag for the model to complete.
fn render_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let tag = match message.role {
            Role::System => "<|system|>",
            Role::User => "<|user|>",
            Role::Assistant => "<|assistant|>",
        };
        prompt.push_str(tag);
        prompt.push('\n');
        prompt.push_str(&message.content);
        prompt.push_str("</s>\n");
    }
    prompt.push_str("<|assistant|>\n");
    prompt
}

#[async_trait]
impl LLMProvider for HuggingFaceClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        sampling: &SamplingConfig,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        match self.api_style {
            ApiStyle::ChatCompletions => self.chat_completions(&messages, &model, sampling).await,
            ApiStyle::TextGeneration => self.text_generation(&messages, &model, sampling).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{FailureKind, GenerationOutcome};
    use mockito::Matcher;
    use std::io::Write;
    use serde_json::json;

    fn client(server: &mockito::Server, style: ApiStyle) -> HuggingFaceClient {
        HuggingFaceClient::new(
            Some("hf_test".to_string()),
            Some(server.url()),
            "org/model".to_string(),
            style,
            Duration::from_secs(5),
        )
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("Be nice."),
            Message::user("msg"),
            Message::assistant("reply1"),
            Message::user("msg2"),
        ]
    }

    #[tokio::test]
    async fn test_chat_completions_request_and_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::PartialJson(json!({
                "model": "org/model",
                "max_tokens": 350,
                "temperature": 0.95,
                "top_p": 0.9,
                "messages": [
                    {"role": "system", "content": "Be nice."},
                    {"role": "user", "content": "msg"},
                    {"role": "assistant", "content": "reply1"},
                    {"role": "user", "content": "msg2"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"  hi there \n"},"finish_reason":"stop"}],
                    "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#,
            )
            .create_async()
            .await;

        let response = client(&server, ApiStyle::ChatCompletions)
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.usage.get("total_tokens"), Some(&15));
        assert_eq!(response.into_text().unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_chat_completions_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body(r#"{"error":"Model is loading"}"#)
            .create_async()
            .await;

        let err = client(&server, ApiStyle::ChatCompletions)
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Http);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_chat_completions_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server, ApiStyle::ChatCompletions)
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_chat_completions_without_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client(&server, ApiStyle::ChatCompletions)
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_missing_content_folds_to_empty_content_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant"},"finish_reason":"length"}]}"#)
            .create_async()
            .await;

        let result = client(&server, ApiStyle::ChatCompletions)
            .chat(conversation(), None, &SamplingConfig::default())
            .await;

        match GenerationOutcome::from(result) {
            GenerationOutcome::Failure(reason) => {
                assert_eq!(reason.kind, FailureKind::EmptyContent)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_text_generation_request_and_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/org/model")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::PartialJson(json!({
                "parameters": {
                    "max_new_tokens": 350,
                    "temperature": 0.95,
                    "top_p": 0.9,
                    "repetition_penalty": 1.1,
                    "return_full_text": false
                }
            })))
            .with_status(200)
            .with_body(r#"[{"generated_text":" sure thing "}]"#)
            .create_async()
            .await;

        let response = client(&server, ApiStyle::TextGeneration)
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.into_text().unwrap(), "sure thing");
    }

    #[tokio::test]
    async fn test_text_generation_single_object_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/other/model")
            .with_status(200)
            .with_body(r#"{"generated_text":"ok"}"#)
            .create_async()
            .await;

        let response = client(&server, ApiStyle::TextGeneration)
            .chat(
                conversation(),
                Some("other/model".to_string()),
                &SamplingConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let client = HuggingFaceClient::new(
            Some("hf_test".to_string()),
            Some("http://127.0.0.1:1".to_string()),
            "org/model".to_string(),
            ApiStyle::ChatCompletions,
            Duration::from_secs(2),
        );

        let err = client
            .chat(conversation(), None, &SamplingConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            FailureKind::Network | FailureKind::Timeout
        ));
    }

    #[tokio::test]
    async fn test_slow_backend_is_timeout_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(br#"{"choices":[]}"#)
            })
            .create_async()
            .await;

        let client = HuggingFaceClient::new(
            Some("hf_test".to_string()),
            Some(server.url()),
            "org/model".to_string(),
            ApiStyle::ChatCompletions,
            Duration::from_millis(500),
        );

        let started = std::time::Instant::now();
        let outcome = GenerationOutcome::from(
            client
                .chat(conversation(), None, &SamplingConfig::default())
                .await,
        );

        assert!(started.elapsed() < Duration::from_secs(3));
        match outcome {
            GenerationOutcome::Failure(reason) => assert_eq!(reason.kind, FailureKind::Timeout),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt(&[Message::system("S"), Message::user("U")]);
        assert_eq!(prompt, "<|system|>\nS</s>\n<|user|>\nU</s>\n<|assistant|>\n");
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = ProviderConfig::default();
        let err = HuggingFaceClient::from_config(&config, None).err().unwrap();
        assert_eq!(err.kind(), FailureKind::Config);

        let client = HuggingFaceClient::from_config(&config, Some("hf_request")).unwrap();
        assert_eq!(client.default_model, config.model);
        assert_eq!(client.api_base(), DEFAULT_CHAT_API_BASE);
    }

    #[test]
    fn test_override_wins_over_configured_token() {
        let config = ProviderConfig {
            api_key: "hf_config".to_string(),
            api_style: ApiStyle::TextGeneration,
            api_base: Some("http://localhost:8080/".to_string()),
            ..ProviderConfig::default()
        };

        let client = HuggingFaceClient::from_config(&config, Some(" ")).unwrap();
        assert_eq!(client.api_key.as_deref(), Some("hf_config"));
        assert_eq!(client.api_base(), "http://localhost:8080");

        let client = HuggingFaceClient::from_config(&config, Some("hf_request")).unwrap();
        assert_eq!(client.api_key.as_deref(), Some("hf_request"));
    }
}
