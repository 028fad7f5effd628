//! HTTP prompt provider
//!
//! Talks to either the Anthropic messages API or any OpenAI-compatible
//! chat completions endpoint (OpenAI, DeepSeek, local servers). The format is
//! picked from the URL.

use crate::core::config::ProviderConfig;
use crate::core::error::{PipelineError, Result};
use crate::llm::provider::PromptProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async LLM client for one configured endpoint
pub struct LlmClient {
    id: String,
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    api_format: ApiFormat,
}

impl LlmClient {
    pub fn new(id: &str, api_key: String, api_url: String, model: String, max_tokens: u32) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            id: id.to_string(),
            client: Client::new(),
            api_key,
            api_url,
            model,
            max_tokens,
            api_format,
        }
    }

    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// Build a client from config, reading the key from `api_key_env`
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PipelineError::Config(format!("{} not set for provider {}", config.api_key_env, config.id))
        })?;
        Ok(Self::new(
            &config.id,
            api_key,
            config.api_url.clone(),
            config.model.clone(),
            config.max_tokens,
        ))
    }

    /// Clients for every configured provider, in priority order.
    ///
    /// A provider whose key is missing is skipped with a warning.
    pub fn providers_from_config(configs: &[ProviderConfig]) -> Vec<Arc<dyn PromptProvider>> {
        configs
            .iter()
            .filter_map(|config| match Self::from_config(config) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn PromptProvider>),
                Err(e) => {
                    tracing::warn!("skipping provider {}: {}", config.id, e);
                    None
                }
            })
            .collect()
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.into(),
            messages: vec![Message { role: "user".into(), content: user.into() }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!("API error {}: {}", status, error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| PipelineError::Provider("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                Message { role: "system".into(), content: system.into() },
                Message { role: "user".into(), content: user.into() },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!("API error {}: {}", status, error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| PipelineError::Provider("Empty response".into()))
    }
}

#[async_trait]
impl PromptProvider for LlmClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_prompt(&self, system: &str, payload: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, payload).await,
            ApiFormat::OpenAI => self.complete_openai(system, payload).await,
        }
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(key_env: &str) -> ProviderConfig {
        ProviderConfig {
            id: "primary".into(),
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-haiku-20240307".into(),
            api_key_env: key_env.into(),
            max_tokens: 2048,
        }
    }

    #[test]
    fn test_format_detection() {
        let client = LlmClient::new(
            "deepseek",
            "test-key".into(),
            "https://api.deepseek.com/chat/completions".into(),
            "deepseek-chat".into(),
            4096,
        );
        assert_eq!(client.api_format(), &ApiFormat::OpenAI);
        assert_eq!(client.id(), "deepseek");
    }

    #[test]
    fn test_from_config_reads_named_key() {
        std::env::set_var("CADENCE_TEST_CLIENT_KEY", "secret");
        let client = LlmClient::from_config(&provider_config("CADENCE_TEST_CLIENT_KEY")).unwrap();
        assert_eq!(client.api_key, "secret");
        assert_eq!(client.max_tokens, 2048);
        assert_eq!(client.api_format(), &ApiFormat::Anthropic);
    }

    #[test]
    fn test_from_config_missing_key() {
        let result = LlmClient::from_config(&provider_config("CADENCE_TEST_UNSET_KEY_8f3a"));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
