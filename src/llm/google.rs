// Google Gemini adapter implementation
// Uses the Generative Language REST API (generateContent)
// API Reference: https://ai.google.dev/api/generate-content
//
// Audio is sent inline as base64 (inlineData parts). Structured output is
// requested through generationConfig.responseSchema.

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, ContentPart, LLMMessage, LLMRequest, LLMResponse, MessageContent, TokenUsage};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

// Request types for the Gemini API
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

// Response types for the Gemini API
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GoogleAdapter {
    /// Create a new Google adapter against the public Generative Language API
    pub fn new(api_key: &str) -> Self {
        Self::with_api_base(api_key, GOOGLE_API_BASE)
    }

    /// Create a Google adapter with a custom endpoint base
    pub fn with_api_base(api_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    /// Convert internal message format to Gemini content
    fn convert_message(msg: &LLMMessage) -> GeminiContent {
        let parts = match &msg.content {
            MessageContent::Text(text) => vec![GeminiPart::Text { text: text.clone() }],
            MessageContent::Multimodal(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
                    ContentPart::InlineData { base64, media_type } => GeminiPart::InlineData {
                        inline_data: GeminiBlob {
                            mime_type: media_type.clone(),
                            data: base64.clone(),
                        },
                    },
                })
                .collect(),
        };

        // Gemini only knows "user" and "model"
        let role = if msg.role == "assistant" { "model" } else { msg.role.as_str() };

        GeminiContent {
            role: Some(role.to_string()),
            parts,
        }
    }

    fn build_request(request: &LLMRequest) -> GeminiRequest {
        GeminiRequest {
            contents: request.messages.iter().map(Self::convert_message).collect(),
            system_instruction: request.system_instruction.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: text.clone() }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: request.response_schema.clone(),
            },
        }
    }

    /// Map a non-success response to an error, keeping throttling distinct
    fn error_from_response(status: StatusCode, body: &str) -> AppError {
        match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(parsed) => {
                let api_status = parsed.error.status.unwrap_or_default();
                let message = format!(
                    "Google API error ({}): {} (status: {})",
                    status, parsed.error.message, api_status
                );
                if status == StatusCode::TOO_MANY_REQUESTS
                    || parsed.error.code == Some(429)
                    || api_status == "RESOURCE_EXHAUSTED"
                {
                    AppError::RateLimited(message)
                } else {
                    AppError::LLMApi(message)
                }
            }
            Err(_) => {
                let message = format!("Google API error ({}): {}", status, body);
                if status == StatusCode::TOO_MANY_REQUESTS {
                    AppError::RateLimited(message)
                } else {
                    AppError::LLMApi(message)
                }
            }
        }
    }
}

#[async_trait]
impl LLMAdapter for GoogleAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = self.endpoint(&request.model);
        let body = Self::build_request(request);

        debug!(model = %request.model, messages = request.messages.len(), "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Google request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::error_from_response(status, &error_text));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Google response: {}", e)))?;

        let candidate = gemini_response
            .candidates
            .first()
            .ok_or_else(|| AppError::LLMApi("Google returned no candidates".to_string()))?;

        let content: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AppError::LLMApi("Google returned an empty candidate".to_string()));
        }

        let usage = gemini_response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content,
            finish_reason: candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "STOP".to_string()),
            usage,
        })
    }
}

/// Gemini models with native audio understanding
pub mod models {
    pub const GEMINI_2_5_FLASH: &str = "gemini-2.5-flash";

    pub const DEFAULT_AUDIO: &str = GEMINI_2_5_FLASH;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn audio_request() -> LLMRequest {
        LLMRequest {
            model: models::DEFAULT_AUDIO.to_string(),
            messages: vec![LLMMessage::user_with_inline_data("analyze", "UklGRg==", "audio/wav")],
            max_tokens: Some(512),
            temperature: Some(0.2),
            system_instruction: Some("be precise".to_string()),
            response_schema: Some(json!({"type": "OBJECT"})),
        }
    }

    #[test]
    fn test_request_serialization() {
        let body = serde_json::to_value(GoogleAdapter::build_request(&audio_request())).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "audio/wav");
        assert_eq!(parts[0]["inlineData"]["data"], "UklGRg==");
        assert_eq!(parts[1]["text"], "analyze");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be precise");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_plain_request_has_no_json_mode() {
        let mut request = audio_request();
        request.response_schema = None;
        let body = serde_json::to_value(GoogleAdapter::build_request(&request)).unwrap();
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_endpoint() {
        let adapter = GoogleAdapter::with_api_base("key", "http://localhost:9000/v1beta/");
        assert_eq!(
            adapter.endpoint("gemini-2.5-flash"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_error_classification() {
        let throttled = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            GoogleAdapter::error_from_response(StatusCode::TOO_MANY_REQUESTS, throttled),
            AppError::RateLimited(_)
        ));

        let unparsable = "slow down";
        assert!(matches!(
            GoogleAdapter::error_from_response(StatusCode::TOO_MANY_REQUESTS, unparsable),
            AppError::RateLimited(_)
        ));

        let invalid = r#"{"error":{"code":400,"message":"bad audio","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            GoogleAdapter::error_from_response(StatusCode::BAD_REQUEST, invalid),
            AppError::LLMApi(_)
        ));
    }

    #[tokio::test]
    async fn test_completion_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "{\"emotionType\":"}, {"text": "\"joy\"}"}], "role": "model"},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = GoogleAdapter::with_api_base("test-key", &server.url());
        let response = adapter.create_chat_completion(&audio_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "{\"emotionType\":\"joy\"}");
        assert_eq!(response.finish_reason, "STOP");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_rate_limit_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let adapter = GoogleAdapter::with_api_base("test-key", &server.url());
        let err = adapter.create_chat_completion(&audio_request()).await.unwrap_err();

        match err {
            AppError::RateLimited(message) => assert!(message.contains("RESOURCE_EXHAUSTED")),
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let adapter = GoogleAdapter::with_api_base("test-key", &server.url());
        let err = adapter.create_chat_completion(&audio_request()).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }
}
