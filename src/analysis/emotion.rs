//! Emotion Analyzer
//!
//! Sends one encoded clip to the LLM layer and parses the structured answer.
//! The prompt tells the model to trust prosody over words: sarcasm, forced
//! cheerfulness and similar mismatches are judged by how things sound.

use super::{AnalysisResult, InferenceClient, InferenceError};
use crate::config::LLMConfig;
use crate::encoding::EncodedAudio;
use crate::llm::provider::{LLMProviderConfig, LLM};
use crate::types::{AppResult, LLMMessage, LLMRequest};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

const SYSTEM_INSTRUCTION: &str = "You are an expert in vocal emotion recognition. \
You judge emotion only from acoustic and prosodic cues: pitch, pitch variation, \
loudness, speaking rate, rhythm, pauses, voice quality (breathiness, tension, tremor) \
and non-verbal sounds such as laughter, sighs or sobbing. Ignore the literal meaning \
of the spoken words. When the words and the way they are spoken disagree, the way \
they are spoken wins.";

const ANALYSIS_PROMPT: &str = "Analyze the attached audio recording.\n\n\
Return a JSON object with exactly these fields:\n\
- emotionType: a short emotion label (e.g. joy, anger, sadness, fear, surprise, disgust, calm, anxiety)\n\
- emotionLevel: integer intensity from 1 (barely perceptible) to 10 (extreme)\n\
- voiceIdentity: a description of the speaker's voice (apparent gender, age range, timbre, accent if evident)\n\
- reasoning: the acoustic evidence behind your judgement, in two to four sentences\n\n\
Do not base emotionType on what is said, only on how it is said.";

const MAX_OUTPUT_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.2;

/// JSON schema for the structured answer (Gemini OpenAPI subset)
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "emotionType": { "type": "STRING" },
            "emotionLevel": { "type": "INTEGER", "minimum": 1, "maximum": 10 },
            "voiceIdentity": { "type": "STRING" },
            "reasoning": { "type": "STRING" }
        },
        "required": ["emotionType", "emotionLevel", "voiceIdentity", "reasoning"],
        "propertyOrdering": ["emotionType", "emotionLevel", "voiceIdentity", "reasoning"]
    })
}

pub struct EmotionAnalyzer {
    llm: LLM,
    model: String,
}

impl EmotionAnalyzer {
    pub fn new(llm: LLM, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Build an analyzer for the configured provider
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let llm = LLM::new(LLMProviderConfig {
            name: config.provider.clone(),
            api_key: config.google_api_key.clone(),
            api_base: config.api_base.clone(),
        })?;

        info!(provider = %config.provider, model = %config.model, "Emotion analyzer ready");
        Ok(Self::new(llm, config.model.clone()))
    }

    fn build_request(&self, audio: &EncodedAudio) -> LLMRequest {
        LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user_with_inline_data(
                ANALYSIS_PROMPT,
                audio.data.clone(),
                audio.media_type.clone(),
            )],
            max_tokens: Some(MAX_OUTPUT_TOKENS),
            temperature: Some(TEMPERATURE),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
            response_schema: Some(response_schema()),
        }
    }
}

#[async_trait]
impl InferenceClient for EmotionAnalyzer {
    async fn analyze(&self, audio: &EncodedAudio) -> Result<AnalysisResult, InferenceError> {
        let request = self.build_request(audio);

        let response = self.llm.create_chat_completion(&request).await?;
        debug!(
            finish_reason = %response.finish_reason,
            tokens = response.usage.total_tokens,
            "Analysis response received"
        );

        Ok(AnalysisResult::parse(&response.content)?)
    }
}
