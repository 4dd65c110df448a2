//! Speech-to-text.
//!
//! The pipeline depends on the [`Transcriber`] trait only; the OpenAI
//! implementation is built once at startup and shared.

pub mod openai;

pub use openai::OpenAiTranscriber;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription service is not configured: {0}")]
    NotConfigured(String),
    #[error("request to transcription service failed: {0}")]
    Request(String),
    #[error("transcription service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected transcription response: {0}")]
    InvalidResponse(String),
}

/// Turns audio into plain text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// `audio_name` carries the file extension the service uses to detect
    /// the container format.
    async fn transcribe(&self, audio: &[u8], audio_name: &str)
        -> Result<String, TranscriptionError>;
}

/// MIME type for an audio file name, by extension.
pub fn audio_mime_type(audio_name: &str) -> &'static str {
    let extension = std::path::Path::new(audio_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
