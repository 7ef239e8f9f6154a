use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Client for OpenAI and any server speaking the same chat completions API.
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
}

impl Default for OpenAICompatibleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAICompatibleClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(config: &LLMConfig) -> String {
        if config.base_url.ends_with('/') {
            format!("{}chat/completions", config.base_url)
        } else {
            format!("{}/chat/completions", config.base_url)
        }
    }

    fn request_body(config: &LLMConfig, system: &str, user: &str) -> serde_json::Value {
        let mut body = json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
        });
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = config.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn parse_content(json: &serde_json::Value) -> Result<String> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        if config.requires_api_key() && config.api_key.is_none() {
            return Err(AppError::LLMError(format!(
                "Missing API key for {:?}",
                config.provider
            )));
        }

        let url = Self::endpoint(config);
        debug!(url = %url, model = %config.model, "Sending chat completion request");

        let mut request = self
            .client
            .post(&url)
            .json(&Self::request_body(config, system, user));
        if let Some(api_key) = &config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        Self::parse_content(&json)
    }
}
