//! Hosted chat-completion APIs (OpenAI, Anthropic) behind [`CompletionClient`].
//!
//! Keys are read from the environment and never persisted.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};

const MAX_RETRIES: u32 = 3;
const MAX_TOKENS: u32 = 1024;

/// Something that can turn a system prompt and a user message into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> ChatResult<String>;
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAI),
            "anthropic" | "claude" => Some(LlmProvider::Anthropic),
            _ => None,
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completion client backed by a hosted chat API.
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// `model` falls back to a small, inexpensive default per provider.
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// Checks OPENAI_API_KEY, then ANTHROPIC_API_KEY. XPF_LLM_MODEL
    /// overrides the model.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_env_with(None, None)
    }

    /// Like [`from_env`](Self::from_env), but with a preferred provider and
    /// model taken from configuration. XPF_LLM_MODEL still wins over `model`.
    pub fn from_env_with(provider: Option<LlmProvider>, model: Option<String>) -> ChatResult<Self> {
        let model = std::env::var("XPF_LLM_MODEL")
            .ok()
            .filter(|m| !m.is_empty())
            .or(model);

        let candidates = match provider {
            Some(p) => vec![p],
            None => vec![LlmProvider::OpenAI, LlmProvider::Anthropic],
        };

        for candidate in candidates {
            if let Ok(api_key) = std::env::var(candidate.key_var()) {
                if !api_key.is_empty() {
                    return Ok(Self::new(candidate, api_key, model));
                }
            }
        }

        Err(ChatError::LlmNotConfigured)
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a prepared request, retrying transient failures (5xx, 429,
    /// network errors) with exponential backoff.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> ChatResult<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 2s, 4s
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} request failed (attempt {}): {}", self.provider, attempt + 1, e);
                    last_error = Some(ChatError::LlmError(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(ChatError::LlmError(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    self.provider,
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChatError::LlmError(format!(
                    "{} API error {}: {}",
                    self.provider, status, body
                )));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| ChatError::LlmError("Max retries exceeded".to_string())))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> ChatResult<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            max_completion_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .send_with_retry(|| {
                self.client
                    .post("https://api.openai.com/v1/chat/completions")
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&request)
            })
            .await?;

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("Failed to parse response: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ChatError::EmptyCompletion)
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> ChatResult<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: user.to_string(),
            }],
        };

        let response = self
            .send_with_retry(|| {
                self.client
                    .post("https://api.anthropic.com/v1/messages")
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&request)
            })
            .await?;

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("Failed to parse response: {}", e)))?;

        result
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or(ChatError::EmptyCompletion)
    }
}

#[async_trait]
impl CompletionClient for LlmAdapter {
    async fn complete(&self, system: &str, user: &str) -> ChatResult<String> {
        debug!("Requesting completion from {} ({})", self.provider, self.model);
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
        }
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_completion_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_selects_provider() {
        // Env vars are process-wide; keep every env assertion in this one test.
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("XPF_LLM_MODEL");

        assert!(matches!(LlmAdapter::from_env(), Err(ChatError::LlmNotConfigured)));

        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        let adapter = LlmAdapter::from_env().unwrap();
        assert_eq!(adapter.provider(), LlmProvider::Anthropic);

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let adapter = LlmAdapter::from_env().unwrap();
        assert_eq!(adapter.provider(), LlmProvider::OpenAI);

        let adapter = LlmAdapter::from_env_with(Some(LlmProvider::Anthropic), None).unwrap();
        assert_eq!(adapter.provider(), LlmProvider::Anthropic);

        std::env::set_var("XPF_LLM_MODEL", "gpt-4o");
        let adapter = LlmAdapter::from_env_with(None, Some("ignored".to_string())).unwrap();
        assert_eq!(adapter.model(), "gpt-4o");

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("XPF_LLM_MODEL");
    }

    #[test]
    fn test_model_defaults_per_provider() {
        let openai = LlmAdapter::new(LlmProvider::OpenAI, "key".to_string(), None);
        assert_eq!(openai.model(), "gpt-4o-mini");

        let anthropic = LlmAdapter::new(LlmProvider::Anthropic, "key".to_string(), None);
        assert_eq!(anthropic.model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(LlmProvider::from_str("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("claude"), Some(LlmProvider::Anthropic));
        assert_eq!(LlmProvider::from_str("cohere"), None);
    }
}
