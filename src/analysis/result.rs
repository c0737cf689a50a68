//! Analysis Result
//!
//! The four fields the inference service returns for one audio clip, and
//! the parser that validates the model's JSON into them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a model response could not be turned into an [`AnalysisResult`]
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),

    #[error("Emotion level {0} is outside 1-10")]
    LevelOutOfRange(i64),
}

/// Emotion intensity, always within 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct EmotionLevel(u8);

impl EmotionLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self, ParseError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ParseError::LevelOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for EmotionLevel {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmotionLevel> for u8 {
    fn from(level: EmotionLevel) -> Self {
        level.0
    }
}

impl fmt::Display for EmotionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub emotion_type: String,
    pub emotion_level: EmotionLevel,
    pub voice_identity: String,
    pub reasoning: String,
}

/// Raw shape requested from the model (camelCase keys)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    emotion_type: Option<String>,
    emotion_level: Option<serde_json::Number>,
    voice_identity: Option<String>,
    reasoning: Option<String>,
}

impl AnalysisResult {
    /// Parse a model response, tolerating a surrounding markdown code fence
    pub fn parse(response: &str) -> Result<Self, ParseError> {
        let json_str = strip_code_fence(response);

        let raw: RawAnalysis =
            serde_json::from_str(json_str).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

        let emotion_type = non_empty(raw.emotion_type, "emotionType")?;
        let voice_identity = non_empty(raw.voice_identity, "voiceIdentity")?;

        let level = raw
            .emotion_level
            .ok_or(ParseError::MissingField("emotionLevel"))?;
        // Models occasionally answer 7.0 for an integer schema
        let level = match level.as_i64() {
            Some(v) => v,
            None => match level.as_f64() {
                Some(f) if f.fract() == 0.0 => f as i64,
                _ => return Err(ParseError::InvalidJson(format!("emotionLevel {} is not an integer", level))),
            },
        };

        Ok(Self {
            emotion_type,
            emotion_level: EmotionLevel::new(level)?,
            voice_identity,
            reasoning: raw.reasoning.unwrap_or_default().trim().to_string(),
        })
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ParseError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ParseError::MissingField(field)),
    }
}

fn strip_code_fence(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .unwrap_or(response)
            .trim()
    } else {
        response.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let result = AnalysisResult::parse(
            r#"{"emotionType":"anger","emotionLevel":8,"voiceIdentity":"adult male, low pitch","reasoning":"raised volume"}"#,
        )
        .unwrap();

        assert_eq!(result.emotion_type, "anger");
        assert_eq!(result.emotion_level.get(), 8);
        assert_eq!(result.voice_identity, "adult male, low pitch");
        assert_eq!(result.reasoning, "raised volume");
    }

    #[test]
    fn test_parse_fenced_json_and_float_level() {
        let response = "```json\n{\"emotionType\":\"calm\",\"emotionLevel\":3.0,\"voiceIdentity\":\"child\",\"reasoning\":\"\"}\n```";
        let result = AnalysisResult::parse(response).unwrap();
        assert_eq!(result.emotion_level.get(), 3);
        assert_eq!(result.reasoning, "");
    }

    #[test]
    fn test_parse_rejects_out_of_range_level() {
        let err = AnalysisResult::parse(
            r#"{"emotionType":"joy","emotionLevel":11,"voiceIdentity":"x","reasoning":"r"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ParseError::LevelOutOfRange(11));

        let err = AnalysisResult::parse(
            r#"{"emotionType":"joy","emotionLevel":0,"voiceIdentity":"x","reasoning":"r"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ParseError::LevelOutOfRange(0));
    }

    #[test]
    fn test_parse_rejects_missing_or_empty_fields() {
        let err = AnalysisResult::parse(r#"{"emotionLevel":5,"voiceIdentity":"x"}"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField("emotionType"));

        let err = AnalysisResult::parse(
            r#"{"emotionType":"  ","emotionLevel":5,"voiceIdentity":"x"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ParseError::MissingField("emotionType"));

        let err = AnalysisResult::parse(r#"{"emotionType":"sad","voiceIdentity":"x"}"#).unwrap_err();
        assert_eq!(err, ParseError::MissingField("emotionLevel"));
    }

    #[test]
    fn test_parse_rejects_fractional_level_and_garbage() {
        assert!(matches!(
            AnalysisResult::parse(r#"{"emotionType":"a","emotionLevel":4.5,"voiceIdentity":"x"}"#),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            AnalysisResult::parse("I think the speaker is happy."),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_emotion_level_serde_bounds() {
        let level: EmotionLevel = serde_json::from_str("10").unwrap();
        assert_eq!(level.get(), 10);
        assert!(serde_json::from_str::<EmotionLevel>("42").is_err());
        assert_eq!(serde_json::to_string(&level).unwrap(), "10");
    }
}
