//! Secure Settings Storage
//!
//! Encrypted file-based storage for user settings.
//! The API key is stored as base64(nonce || AES-256-GCM ciphertext).

use super::UserSettings;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

const SETTINGS_FILE: &str = "settings.json";
const ENCRYPTION_KEY_FILE: &str = ".settings_key";
const NONCE_SIZE: usize = 12;

/// Settings storage manager
pub struct SettingsStorage {
    settings_path: PathBuf,
    key_path: PathBuf,
}

impl SettingsStorage {
    /// Storage under the platform data directory
    pub fn new() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vox-emotion");
        Self::with_path(base_dir)
    }

    /// Create storage with custom path (useful for testing)
    pub fn with_path(base_dir: PathBuf) -> Self {
        Self {
            settings_path: base_dir.join(SETTINGS_FILE),
            key_path: base_dir.join(ENCRYPTION_KEY_FILE),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    async fn ensure_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Get or create the encryption key
    async fn get_or_create_key(&self) -> anyhow::Result<[u8; 32]> {
        self.ensure_dir().await?;

        if fs::try_exists(&self.key_path).await? {
            let key_data = fs::read(&self.key_path).await?;
            let key_bytes = BASE64.decode(&key_data)?;
            if key_bytes.len() == 32 {
                let mut key = [0u8; 32];
                key.copy_from_slice(&key_bytes);
                return Ok(key);
            }
            warn!("Settings key file is malformed, generating a new one");
        }

        let key: [u8; 32] = rand::random();
        fs::write(&self.key_path, BASE64.encode(key)).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.key_path, perms).await?;
        }

        info!("Generated new encryption key for settings");
        Ok(key)
    }

    fn encrypt(&self, plaintext: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let cipher = Aes256Gcm::new_from_slice(key)?;
        let nonce_bytes: [u8; NONCE_SIZE] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);
        Ok(BASE64.encode(&combined))
    }

    fn decrypt(&self, encrypted: &str, key: &[u8; 32]) -> anyhow::Result<String> {
        let combined = BASE64.decode(encrypted)?;
        if combined.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("Invalid encrypted data"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(key)?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(Into::into)
    }

    /// Load settings from disk, or defaults when nothing was saved yet
    pub async fn load(&self) -> anyhow::Result<UserSettings> {
        if !fs::try_exists(&self.settings_path).await? {
            info!("No settings file found, using defaults");
            return Ok(UserSettings::default());
        }

        let key = self.get_or_create_key().await?;
        let content = fs::read_to_string(&self.settings_path).await?;
        let mut settings: UserSettings = serde_json::from_str(&content)?;

        if let Some(encrypted) = settings.google.api_key.take().filter(|k| !k.is_empty()) {
            match self.decrypt(&encrypted, &key) {
                Ok(decrypted) => settings.google.api_key = Some(decrypted),
                Err(e) => warn!("Failed to decrypt API key, it may be corrupted: {}", e),
            }
        }

        info!("Loaded settings from {:?}", self.settings_path);
        Ok(settings)
    }

    pub async fn save(&self, settings: &UserSettings) -> anyhow::Result<()> {
        self.ensure_dir().await?;
        let key = self.get_or_create_key().await?;

        let mut encrypted_settings = settings.clone();
        if let Some(api_key) = settings.google.api_key.as_ref().filter(|k| !k.is_empty()) {
            encrypted_settings.google.api_key = Some(self.encrypt(api_key, &key)?);
        }

        let content = serde_json::to_string_pretty(&encrypted_settings)?;
        fs::write(&self.settings_path, content).await?;

        info!("Saved settings to {:?}", self.settings_path);
        Ok(())
    }
}

impl Default for SettingsStorage {
    fn default() -> Self {
        Self::new()
    }
}
