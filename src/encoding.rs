//! Audio Encoding
//!
//! Turns a queued audio file into the transport payload the inference
//! service accepts: base64 text plus a declared media type.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Fallback media type when the extension says nothing useful
pub const DEFAULT_AUDIO_MEDIA_TYPE: &str = "audio/mpeg";

/// Errors raised while reading or encoding a source file
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is empty")]
    Empty(PathBuf),
}

/// Reference to the audio a job analyses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub path: PathBuf,
    /// Display name (file name component)
    pub name: String,
    pub size_bytes: u64,
}

impl AudioSource {
    /// Build a source from a path, reading its size from file metadata
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        Ok(Self::new(path, metadata.len()))
    }

    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path,
            name,
            size_bytes,
        }
    }
}

/// Transport-safe payload handed to the inference client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    /// Standard-alphabet base64 of the raw file bytes
    pub data: String,
    pub media_type: String,
}

#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, source: &AudioSource) -> Result<EncodedAudio, EncodeError>;
}

/// Reads files from disk and base64-encodes them
#[derive(Debug, Clone, Default)]
pub struct FileEncoder;

impl FileEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Encoder for FileEncoder {
    async fn encode(&self, source: &AudioSource) -> Result<EncodedAudio, EncodeError> {
        let bytes = fs::read(&source.path).await.map_err(|e| EncodeError::Read {
            path: source.path.clone(),
            source: e,
        })?;

        if bytes.is_empty() {
            return Err(EncodeError::Empty(source.path.clone()));
        }

        let media_type = media_type_for(&source.path);
        debug!(file = %source.name, bytes = bytes.len(), media_type = %media_type, "Encoded audio");

        Ok(EncodedAudio {
            data: BASE64.encode(&bytes),
            media_type,
        })
    }
}

/// Guess the media type of an audio file from its extension
pub fn media_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    // mime_guess has no entry (or a non-audio one) for some common audio containers
    match ext.as_deref() {
        Some("m4a") => return "audio/mp4".to_string(),
        Some("opus") => return "audio/ogg".to_string(),
        Some("webm") => return "audio/webm".to_string(),
        _ => {}
    }

    mime_guess::from_path(path)
        .iter()
        .find(|m| m.type_() == mime::AUDIO)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_AUDIO_MEDIA_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_type_for_common_extensions() {
        assert_eq!(media_type_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(media_type_for(Path::new("a.WAV")).split('/').next(), Some("audio"));
        assert_eq!(media_type_for(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(media_type_for(Path::new("a.opus")), "audio/ogg");
        assert_eq!(media_type_for(Path::new("noext")), DEFAULT_AUDIO_MEDIA_TYPE);
        assert_eq!(media_type_for(Path::new("notes.txt")), DEFAULT_AUDIO_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_encode_reads_and_base64s() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, b"hello").unwrap();

        let source = AudioSource::from_path(&path).await.unwrap();
        assert_eq!(source.name, "clip.mp3");
        assert_eq!(source.size_bytes, 5);

        let encoded = FileEncoder::new().encode(&source).await.unwrap();
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.media_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_encode_missing_file_fails() {
        let source = AudioSource::new(PathBuf::from("/definitely/not/here.wav"), 0);
        let err = FileEncoder::new().encode(&source).await.unwrap_err();
        assert!(matches!(err, EncodeError::Read { .. }));
    }

    #[tokio::test]
    async fn test_encode_empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silence.wav");
        std::fs::write(&path, b"").unwrap();

        let source = AudioSource::from_path(&path).await.unwrap();
        let err = FileEncoder::new().encode(&source).await.unwrap_err();
        assert!(matches!(err, EncodeError::Empty(_)));
    }

    #[tokio::test]
    async fn test_from_path_rejects_directories() {
        let dir = TempDir::new().unwrap();
        assert!(AudioSource::from_path(dir.path()).await.is_err());
    }
}
