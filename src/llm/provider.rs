use async_trait::async_trait;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    /// Override for the provider's endpoint base (proxies, tests)
    pub api_base: Option<String>,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let adapter: Box<dyn LLMAdapter> = match provider.name.as_str() {
            "google" | "gemini" => match provider.api_base {
                Some(base) => Box::new(crate::llm::google::GoogleAdapter::with_api_base(
                    &provider.api_key,
                    &base,
                )),
                None => Box::new(crate::llm::google::GoogleAdapter::new(&provider.api_key)),
            },
            other => {
                return Err(AppError::InvalidRequest(format!(
                    "Unsupported provider: {}",
                    other
                )))
            }
        };

        Ok(Self { adapter })
    }

    /// Wrap an already-built adapter
    pub fn from_adapter(adapter: Box<dyn LLMAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
