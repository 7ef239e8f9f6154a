use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    /// OpenAI-compatible server on the local machine (llama.cpp, LM Studio, ...).
    Local,
    OpenAI,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    /// Plain key or a secret reference (`env:NAME`, `keychain:NAME`, `plain:value`).
    pub api_key: Option<String>,
    #[validate(range(min = 1, max = 32768))]
    pub max_tokens: Option<u32>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
}

impl LLMConfig {
    pub fn requires_api_key(&self) -> bool {
        matches!(self.provider, LLMProvider::OpenAI)
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Local,
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            api_key: None,
            max_tokens: Some(200),
            temperature: None,
        }
    }
}
