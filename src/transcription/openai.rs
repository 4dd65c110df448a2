use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{audio_mime_type, Transcriber, TranscriptionError};
use crate::config::OpenAiConfig;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Whisper transcription over the OpenAI audio API.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(
        api_key: String,
        api_base: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranscriptionError::NotConfigured(e.to_string()))?;

        let endpoint = format!("{}/audio/transcriptions", api_base.trim_end_matches('/'));
        info!("Initialized OpenAI transcriber with endpoint: {}", endpoint);

        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }

    pub fn from_config(config: &OpenAiConfig) -> Result<Self, TranscriptionError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            TranscriptionError::NotConfigured(format!(
                "set openai.api_key or {}",
                crate::config::API_KEY_ENV
            ))
        })?;

        Self::new(
            api_key,
            &config.api_base,
            config.transcription_model.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        audio_name: &str,
    ) -> Result<String, TranscriptionError> {
        let file_part = Part::bytes(audio.to_vec())
            .file_name(audio_name.to_string())
            .mime_str(audio_mime_type(audio_name))
            .map_err(|e| TranscriptionError::Request(format!("mime: {}", e)))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);

        debug!(
            "Sending {} bytes to {} with model {}",
            audio.len(),
            self.endpoint,
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Request(format!("body: {}", e)))?;

        if !status.is_success() {
            error!("Transcription request failed with status {}: {}", status, body);
            let body = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let transcription: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;

        let text = transcription.text.trim().to_string();
        info!("Transcription complete: {} chars", text.len());
        debug!("Raw transcription: {}", text);

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base() {
        let transcriber = OpenAiTranscriber::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1/",
            "whisper-1".to_string(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            transcriber.endpoint(),
            "https://api.openai.com/v1/audio/transcriptions"
        );
        assert_eq!(transcriber.name(), "OpenAI Whisper");
    }

    #[test]
    fn test_from_config_uses_configured_key() {
        let config = OpenAiConfig {
            api_key: Some("sk-config".to_string()),
            api_base: "http://localhost:9999/v1".to_string(),
            ..OpenAiConfig::default()
        };
        let transcriber = OpenAiTranscriber::from_config(&config).unwrap();
        assert_eq!(transcriber.api_key, "sk-config");
        assert_eq!(transcriber.model, "whisper-1");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let transcriber = OpenAiTranscriber::new(
            "sk-test".to_string(),
            "http://127.0.0.1:9",
            "whisper-1".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = transcriber.transcribe(b"RIFF", "a.wav").await;
        assert!(matches!(result, Err(TranscriptionError::Request(_))));
    }
}
