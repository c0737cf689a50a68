//! Settings Module
//!
//! Persists the Google API key and preferred model between sessions.
//! The API key is encrypted at rest using AES-256-GCM.

pub mod storage;

pub use storage::*;

use crate::config::LLMConfig;
use serde::{Deserialize, Serialize};

/// Google provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    /// The API key (encrypted at rest, decrypted when loaded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserSettings {
    #[serde(default)]
    pub google: ProviderConfig,
}

impl UserSettings {
    pub fn set_api_key(&mut self, key: &str) {
        let key = key.trim();
        self.google.api_key = if key.is_empty() { None } else { Some(key.to_string()) };
    }

    /// Stored values win over the environment
    pub fn apply_to(&self, llm: &mut LLMConfig) {
        if let Some(key) = self.google.api_key.as_ref().filter(|k| !k.is_empty()) {
            llm.google_api_key = key.clone();
        }
        if let Some(model) = self.google.default_model.as_ref().filter(|m| !m.is_empty()) {
            llm.model = model.clone();
        }
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus::from(&self.google)
    }
}

/// Masked view of a provider for display
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub has_key: bool,
    /// Last 4 chars only
    pub key_hint: Option<String>,
    pub default_model: Option<String>,
}

impl From<&ProviderConfig> for ProviderStatus {
    fn from(config: &ProviderConfig) -> Self {
        let (has_key, key_hint) = match &config.api_key {
            Some(key) if key.chars().count() > 4 => {
                let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                (true, Some(format!("••••{}", tail)))
            }
            Some(_) => (true, Some("••••".to_string())),
            None => (false, None),
        };

        Self {
            has_key,
            key_hint,
            default_model: config.default_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config() -> LLMConfig {
        LLMConfig {
            provider: "google".to_string(),
            google_api_key: "env-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base: None,
        }
    }

    #[test]
    fn test_stored_key_overrides_environment() {
        let mut settings = UserSettings::default();
        settings.set_api_key("  stored-key  ");
        settings.google.default_model = Some("gemini-2.5-pro".to_string());

        let mut llm = llm_config();
        settings.apply_to(&mut llm);
        assert_eq!(llm.google_api_key, "stored-key");
        assert_eq!(llm.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_empty_settings_keep_environment() {
        let mut llm = llm_config();
        UserSettings::default().apply_to(&mut llm);
        assert_eq!(llm.google_api_key, "env-key");

        let mut settings = UserSettings::default();
        settings.set_api_key("   ");
        assert!(settings.google.api_key.is_none());
    }

    #[test]
    fn test_status_masks_key() {
        let mut settings = UserSettings::default();
        assert!(!settings.status().has_key);

        settings.set_api_key("AIzaSyABCDEFGH1234");
        let status = settings.status();
        assert!(status.has_key);
        assert_eq!(status.key_hint.as_deref(), Some("••••1234"));

        settings.set_api_key("abc");
        assert_eq!(settings.status().key_hint.as_deref(), Some("••••"));
    }
}
