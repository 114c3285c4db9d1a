//! Model Provider Abstraction
//!
//! Text-completion clients used by the LLM generator. OpenAI, Ollama and custom
//! local servers share the OpenAI-compatible chat format; Anthropic has its own
//! messages API. The generator only sees [`ModelProviderClient`].

use crate::error::MockError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, MockError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

fn map_http_error(error: reqwest::Error) -> MockError {
    if let Some(status) = error.status() {
        status_error(status, &error.to_string())
    } else if error.is_timeout() {
        MockError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        MockError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        MockError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn status_error(status: StatusCode, detail: &str) -> MockError {
    match status.as_u16() {
        401 | 403 => MockError::ProviderAuthFailed(format!("Authentication failed: {}", detail)),
        429 => MockError::ProviderRateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => MockError::ProviderModelNotFound(format!("Model not found: {}", detail)),
        _ => MockError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

async fn error_body(response: reqwest::Response) -> MockError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    status_error(status, &text)
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client(timeout: Duration) -> Result<Client, MockError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| MockError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Client for any server speaking the OpenAI chat-completions format
pub struct OpenAiCompatibleClient {
    client: Client,
    provider_name: &'static str,
    model: String,
    completions_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        provider_name: &'static str,
        model: String,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MockError> {
        Ok(Self {
            client: build_provider_http_client(timeout)?,
            provider_name,
            model,
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, MockError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .into_iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(&self.completions_url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder.send().await.map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(error_body(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| MockError::ProviderError(format!("Failed to parse response: {}", e)))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MockError::ProviderError("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: completion.model,
            usage: completion.usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic messages API client
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    url: String,
}

impl AnthropicClient {
    pub fn new(
        model: String,
        api_key: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MockError> {
        Ok(Self {
            client: build_provider_http_client(timeout)?,
            model,
            api_key,
            url: endpoint.unwrap_or_else(|| ANTHROPIC_MESSAGES_URL.to_string()),
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, MockError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<_> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(4096),
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n"));
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(error_body(response).await);
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
            model: String,
            usage: Option<AnthropicUsage>,
            stop_reason: Option<String>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        #[derive(Deserialize)]
        struct AnthropicUsage {
            input_tokens: u32,
            output_tokens: u32,
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| MockError::ProviderError(format!("Failed to parse response: {}", e)))?;

        Ok(CompletionResponse {
            content: completion
                .content
                .into_iter()
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join(""),
            model: completion.model,
            usage: completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            finish_reason: completion.stop_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    #[default]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

/// Generator model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub provider_type: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL; required for `local`, optional elsewhere.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key, read when `api_key` is unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.2)
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::default(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    /// Explicit key, else the configured environment variable, else the
    /// provider's conventional variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let var = self.api_key_env.clone().or_else(|| match self.provider_type {
            ProviderType::OpenAI => Some("OPENAI_API_KEY".to_string()),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY".to_string()),
            _ => None,
        })?;
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("Invalid endpoint URL '{}': {}", endpoint, e))?;
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local provider requires an endpoint".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature {} outside 0.0-2.0", temperature));
            }
        }
        Ok(())
    }
}

/// Builds provider clients from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn ModelProviderClient>, MockError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let model = config.model.clone();
        let client: Arc<dyn ModelProviderClient> = match config.provider_type {
            ProviderType::OpenAI => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    MockError::ConfigError("OpenAI provider requires an API key".to_string())
                })?;
                let base_url = config.endpoint.as_deref().unwrap_or("https://api.openai.com/v1");
                Arc::new(OpenAiCompatibleClient::new(
                    "openai",
                    model,
                    base_url,
                    Some(api_key),
                    timeout,
                )?)
            }
            ProviderType::Anthropic => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    MockError::ConfigError("Anthropic provider requires an API key".to_string())
                })?;
                Arc::new(AnthropicClient::new(
                    model,
                    api_key,
                    config.endpoint.clone(),
                    timeout,
                )?)
            }
            ProviderType::Ollama => {
                let base = config.endpoint.as_deref().unwrap_or("http://localhost:11434");
                let base_url = format!("{}/v1", base.trim_end_matches('/'));
                Arc::new(OpenAiCompatibleClient::new(
                    "ollama",
                    model,
                    &base_url,
                    config.resolve_api_key(),
                    timeout,
                )?)
            }
            ProviderType::LocalCustom => {
                let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                    MockError::ConfigError("Local provider requires an endpoint".to_string())
                })?;
                Arc::new(OpenAiCompatibleClient::new(
                    "local",
                    model,
                    endpoint,
                    config.resolve_api_key(),
                    timeout,
                )?)
            }
        };
        info!(
            provider = client.provider_name(),
            model = client.model_name(),
            "Configured model provider"
        );
        Ok(client)
    }
}

/// Scripted provider for tests; replays responses in order, then repeats the last.
#[cfg(test)]
pub struct MockProvider {
    responses: Vec<String>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(String::from).collect(),
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, MockError> {
        let mut prompts = self.prompts.lock();
        let index = prompts.len().min(self.responses.len().saturating_sub(1));
        prompts.push(messages.into_iter().map(|m| m.content).collect::<Vec<_>>().join("\n"));
        Ok(CompletionResponse {
            content: self.responses.get(index).cloned().unwrap_or_default(),
            model: "mock".to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_names() {
        let parsed: ProviderConfig =
            serde_json::from_str(r#"{"provider_type":"local","endpoint":"http://localhost:8080/v1"}"#)
                .unwrap();
        assert_eq!(parsed.provider_type, ProviderType::LocalCustom);
        assert_eq!(parsed.model, "llama3.1:8b");
        assert_eq!(parsed.temperature, Some(0.2));
        assert_eq!(
            serde_json::to_string(&ProviderType::OpenAI).unwrap(),
            "\"openai\""
        );
    }

    #[test]
    fn test_provider_config_validation() {
        let mut config = ProviderConfig::default();
        assert!(config.validate().is_ok());

        config.model = " ".to_string();
        assert!(config.validate().is_err());

        config.model = "gpt-4o".to_string();
        config.endpoint = Some("not-a-url".to_string());
        assert!(config.validate().is_err());

        config.endpoint = None;
        config.provider_type = ProviderType::LocalCustom;
        assert!(config.validate().is_err());

        config.provider_type = ProviderType::Ollama;
        config.temperature = Some(3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_factory_builds_clients() {
        let ollama = ProviderFactory::create_client(&ProviderConfig::default()).unwrap();
        assert_eq!(ollama.provider_name(), "ollama");
        assert_eq!(ollama.model_name(), "llama3.1:8b");

        let local = ProviderConfig {
            provider_type: ProviderType::LocalCustom,
            endpoint: Some("http://localhost:8080/v1".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(ProviderFactory::create_client(&local).unwrap().provider_name(), "local");

        let anthropic = ProviderConfig {
            provider_type: ProviderType::Anthropic,
            api_key: Some("test-key".to_string()),
            model: "claude-test".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(
            ProviderFactory::create_client(&anthropic).unwrap().provider_name(),
            "anthropic"
        );

        let keyless = ProviderConfig {
            provider_type: ProviderType::OpenAI,
            api_key_env: Some("SYNTHMOCK_TEST_UNSET_KEY".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            ProviderFactory::create_client(&keyless),
            Err(MockError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_provider_replays() {
        let provider = MockProvider::new(vec!["first", "second"]);
        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = provider
                .complete(vec![ChatMessage::user("hi")], CompletionOptions::default())
                .await
                .unwrap();
            seen.push(response.content);
        }
        assert_eq!(seen, vec!["first", "second", "second"]);
        assert_eq!(provider.prompts().len(), 3);
    }
}
