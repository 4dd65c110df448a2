//! Meeting summarization.
//!
//! The transcript goes to a language model with a fixed instruction asking
//! for one JSON object holding a summary and a to-do list. The reply must be
//! a JSON object; absent fields become empty text.

pub mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str =
    "You are a professional meeting assistant. Output ONLY a valid JSON object.";

const INSTRUCTION: &str = "You are a professional assistant. Summarize the following meeting transcript. \
Also, extract all action items and format them as a bulleted list. \
The output MUST be in a single JSON object with two keys: 'summary' (string) and 'todo_list' (string).";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model is not configured: {0}")]
    NotConfigured(String),
    #[error("request to language model failed: {0}")]
    Request(String),
    #[error("language model returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected language model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("summary response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("summary response is not a JSON object (got {0})")]
    NotAnObject(&'static str),
}

/// A model that answers with a JSON document.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingSummary {
    pub summary: String,
    pub todo_list: String,
}

#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn LlmClient>,
}

impl Summarizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn summarize(&self, transcript: &str) -> Result<MeetingSummary, SummaryError> {
        let prompt = build_prompt(transcript);
        let raw = self.client.complete_json(SYSTEM_PROMPT, &prompt).await?;
        debug!("Raw summary response: {}", raw);

        let summary = parse_summary(&raw)?;
        info!(
            "Summary ready: {} chars, to-do list {} chars",
            summary.summary.len(),
            summary.todo_list.len()
        );
        Ok(summary)
    }
}

pub fn build_prompt(transcript: &str) -> String {
    format!("{}\n\nTRANSCRIPT: {}", INSTRUCTION, transcript)
}

/// Parse a model reply into a [`MeetingSummary`].
pub fn parse_summary(raw: &str) -> Result<MeetingSummary, SummaryError> {
    let value: Value = serde_json::from_str(raw.trim())?;

    let object = match value {
        Value::Object(object) => object,
        other => return Err(SummaryError::NotAnObject(json_kind(&other))),
    };

    Ok(MeetingSummary {
        summary: text_field(&object, &["summary"]),
        todo_list: text_field(&object, &["todo_list", "todos"]),
    })
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| object.get(*key))
        .map(value_to_text)
        .unwrap_or_default()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
