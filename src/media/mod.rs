//! Media normalization.
//!
//! Uploads are classified by extension. Audio passes through untouched;
//! video goes through an external decoder that pulls out the audio track.

pub mod ffmpeg;

pub use ffmpeg::FfmpegDecoder;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::storage::sanitize_file_name;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg"];

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("decoder failed: {0}")]
    Decoder(String),
    #[error("decoder not available: {0}")]
    DecoderUnavailable(String),
    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an upload is, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_filename(filename: &str) -> Result<Self, MediaError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Video)
        } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Audio)
        } else if extension.is_empty() {
            Err(MediaError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                filename
            )))
        } else {
            Err(MediaError::UnsupportedFormat(format!(".{}", extension)))
        }
    }
}

/// Audio ready for transcription.
#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub bytes: Vec<u8>,
    pub name: String,
}

/// External capability that writes the audio track of `input` to `output`.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError>;
}

#[derive(Clone)]
pub struct MediaExtractor {
    decoder: Arc<dyn AudioDecoder>,
}

impl MediaExtractor {
    pub fn new(decoder: Arc<dyn AudioDecoder>) -> Self {
        Self { decoder }
    }

    pub async fn extract(&self, bytes: Vec<u8>, filename: &str) -> Result<ExtractedAudio, MediaError> {
        match MediaKind::from_filename(filename)? {
            MediaKind::Audio => {
                debug!("{} is audio, passing through", filename);
                Ok(ExtractedAudio {
                    bytes,
                    name: filename.to_string(),
                })
            }
            MediaKind::Video => self.extract_from_video(&bytes, filename).await,
        }
    }

    async fn extract_from_video(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<ExtractedAudio, MediaError> {
        // Removed on drop, on every return path.
        let workdir = tempfile::Builder::new().prefix("recap-media-").tempdir()?;

        let safe_name = sanitize_file_name(filename);
        let input = workdir.path().join(&safe_name);
        let output = workdir.path().join(format!("{}_extracted.mp3", safe_name));

        tokio::fs::write(&input, bytes).await?;

        info!("Extracting audio from {}", filename);
        self.decoder.extract_audio(&input, &output).await?;

        let audio = tokio::fs::read(&output).await.map_err(|e| {
            MediaError::Decoder(format!("decoder produced no readable output: {}", e))
        })?;

        info!(
            "Extracted {} bytes of audio from {} ({} bytes)",
            audio.len(),
            filename,
            bytes.len()
        );

        Ok(ExtractedAudio {
            bytes: audio,
            name: format!("{}_extracted.mp3", filename),
        })
    }
}
