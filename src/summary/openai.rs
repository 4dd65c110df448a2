use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{LlmClient, LlmError};
use crate::config::OpenAiConfig;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Chat completions against an OpenAI-compatible API, in JSON mode.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: String,
        api_base: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", api_base.trim_end_matches('/'));
        info!("Initialized chat client for {} at {}", model, endpoint);

        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }

    pub fn from_config(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            LlmError::NotConfigured(format!(
                "set openai.api_key or {}",
                crate::config::API_KEY_ENV
            ))
        })?;

        Self::new(
            api_key,
            &config.api_base,
            config.summary_model.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("Sending chat completion request to: {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            error!("Chat completion failed with status {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no content".to_string()))
    }
}
