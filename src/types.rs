// Type definitions and enums

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_instruction: Option<String>,
    /// JSON schema the provider should constrain its output to
    pub response_schema: Option<serde_json::Value>,
}

/// Content part for multimodal messages (text, inline audio, etc.)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "inline_data")]
    InlineData {
        base64: String,
        media_type: String, // e.g., "audio/mpeg", "audio/wav"
    },
}

/// Message content - can be simple text or multimodal (text + media)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Multimodal(Vec<ContentPart>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "model"
    pub content: MessageContent,
}

impl LLMMessage {
    /// Create a user message carrying base64 media followed by a text prompt
    pub fn user_with_inline_data(
        text: impl Into<String>,
        base64: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Multimodal(vec![
                ContentPart::InlineData {
                    base64: base64.into(),
                    media_type: media_type.into(),
                },
                ContentPart::Text { text: text.into() },
            ]),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM API error: {0}")]
    LLMApi(String),

    /// The provider signalled throttling through a structured status
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A batch run is already active")]
    RunActive,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_data_precedes_prompt() {
        let msg = LLMMessage::user_with_inline_data("describe", "AAAA", "audio/wav");
        assert_eq!(msg.role, "user");

        let MessageContent::Multimodal(parts) = &msg.content else {
            panic!("expected multimodal content");
        };
        assert!(matches!(
            &parts[0],
            ContentPart::InlineData { base64, media_type } if base64 == "AAAA" && media_type == "audio/wav"
        ));
        assert!(matches!(&parts[1], ContentPart::Text { text } if text == "describe"));
    }
}
