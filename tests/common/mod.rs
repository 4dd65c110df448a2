#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use recap::api::{self, ApiState};
use recap::db::Database;
use recap::jobs::{JobQueue, JobWorker, MeetingPipeline};
use recap::media::{AudioDecoder, MediaError, MediaExtractor};
use recap::storage::RecordingStore;
use recap::summary::{LlmClient, LlmError, Summarizer};
use recap::transcription::{Transcriber, TranscriptionError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "recap-test-boundary";

#[derive(Default)]
pub struct CountingDecoder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AudioDecoder for CountingDecoder {
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let video = std::fs::read(input)?;
        std::fs::write(output, [b"MP3:".as_slice(), video.as_slice()].concat())?;
        Ok(())
    }
}

/// Echoes the audio bytes back as the transcript, after a short delay.
pub struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        _audio_name: &str,
    ) -> Result<String, TranscriptionError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(format!("transcript of {}", String::from_utf8_lossy(audio)))
    }
}

/// Replies with `reply`, or with a reply derived from the transcript when
/// `reply` is `None`.
pub struct ScriptedLlm {
    pub reply: Option<String>,
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete_json(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let transcript = user.rsplit("TRANSCRIPT: ").next().unwrap_or_default();
        Ok(serde_json::json!({
            "summary": format!("Summary: {}", transcript),
            "todo_list": "- Follow up",
        })
        .to_string())
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub db: Database,
    pub router: Router,
    pub decoder: Arc<CountingDecoder>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_llm_reply(None)
    }

    pub fn with_llm_reply(reply: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in(dir.path()).unwrap();
        let decoder = Arc::new(CountingDecoder::default());

        let pipeline = MeetingPipeline::new(
            db.clone(),
            RecordingStore::new(dir.path()),
            MediaExtractor::new(decoder.clone()),
            Arc::new(EchoTranscriber),
            Summarizer::new(Arc::new(ScriptedLlm {
                reply: reply.map(str::to_string),
            })),
        );

        let (queue, receiver) = JobQueue::new(db.clone(), 16);
        tokio::spawn(JobWorker::new(receiver, pipeline, 2).run());

        let router = api::router(
            ApiState {
                queue,
                db: db.clone(),
            },
            10 * 1024 * 1024,
        );

        Self {
            dir,
            db,
            router,
            decoder,
        }
    }
}

pub fn multipart_request(uri: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    multipart_part_request(uri, field, Some(filename), content)
}

/// Single-part form. `filename: None` sends a plain form value.
pub fn multipart_part_request(
    uri: &str,
    field: &str,
    filename: Option<&str>,
    content: &[u8],
) -> Request<Body> {
    let disposition = match filename {
        Some(filename) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
