//! In-process doubles for the pipeline's external capabilities.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use super::{Job, JobId, MeetingPipeline};
use crate::db::{Database, JobRepository, MeetingRecord, MeetingRepository};
use crate::global::RECORDINGS_DIR;
use crate::media::{AudioDecoder, MediaError, MediaExtractor};
use crate::storage::RecordingStore;
use crate::summary::{LlmClient, LlmError, Summarizer};
use crate::transcription::{Transcriber, TranscriptionError};

pub const TRANSCRIPT: &str = "we agreed to ship on friday";
pub const SUMMARY_REPLY: &str =
    r#"{"summary": "Release planning.", "todo_list": "- Ship on Friday"}"#;

/// Writes `MP3:` followed by the input bytes.
#[derive(Default)]
pub struct FakeDecoder {
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeDecoder {
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioDecoder for FakeDecoder {
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        self.calls.lock().unwrap().push(input.to_path_buf());
        let video = std::fs::read(input)?;
        std::fs::write(output, [b"MP3:".as_slice(), video.as_slice()].concat())?;
        Ok(())
    }
}

pub struct FakeTranscriber {
    reply: Option<String>,
    gate: Option<Arc<Semaphore>>,
    seen: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeTranscriber {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            gate: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            gate: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Each call consumes one permit from `gate` before replying.
    pub fn gated(text: &str, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(text)
        }
    }

    pub fn audio_names(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn audio_seen(&self) -> Vec<Vec<u8>> {
        self.seen.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        audio_name: &str,
    ) -> Result<String, TranscriptionError> {
        self.seen
            .lock()
            .unwrap()
            .push((audio_name.to_string(), audio.to_vec()));
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.reply.clone().ok_or_else(|| TranscriptionError::Api {
            status: 500,
            body: "upstream unavailable".to_string(),
        })
    }
}

pub struct FakeLlm {
    reply: String,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete_json(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Ok(self.reply.clone())
    }
}

/// A pipeline over a temp-dir database and recording store.
pub struct Harness {
    pub dir: TempDir,
    pub pipeline: MeetingPipeline,
    pub decoder: Arc<FakeDecoder>,
    pub transcriber: Arc<FakeTranscriber>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            FakeTranscriber::replying(TRANSCRIPT),
            FakeLlm::replying(SUMMARY_REPLY),
        )
    }

    pub fn with_llm(llm: FakeLlm) -> Self {
        Self::build(FakeTranscriber::replying(TRANSCRIPT), llm)
    }

    pub fn with_transcriber(transcriber: FakeTranscriber) -> Self {
        Self::build(transcriber, FakeLlm::replying(SUMMARY_REPLY))
    }

    fn build(transcriber: FakeTranscriber, llm: FakeLlm) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in(dir.path()).unwrap();
        let decoder = Arc::new(FakeDecoder::default());
        let transcriber = Arc::new(transcriber);

        let pipeline = MeetingPipeline::new(
            db,
            RecordingStore::new(dir.path()),
            MediaExtractor::new(decoder.clone()),
            transcriber.clone(),
            Summarizer::new(Arc::new(llm)),
        );

        Self {
            dir,
            pipeline,
            decoder,
            transcriber,
        }
    }

    /// Insert a fresh `PENDING` job.
    pub async fn submit_record(&self) -> JobId {
        let job = Job::new();
        let job_id = job.id;
        self.pipeline
            .database()
            .call(move |conn| JobRepository::insert(conn, &job))
            .await
            .unwrap();
        job_id
    }

    pub async fn load(&self, job_id: JobId) -> (Job, Option<MeetingRecord>) {
        self.pipeline
            .database()
            .call(move |conn| {
                let job = JobRepository::get(conn, job_id)?.expect("job exists");
                let meeting = MeetingRepository::get(conn, job_id)?;
                Ok((job, meeting))
            })
            .await
            .unwrap()
    }

    pub fn recording_exists(&self, reference: &str) -> bool {
        self.dir.path().join(reference).exists()
    }

    pub fn stored_recordings(&self) -> usize {
        std::fs::read_dir(self.dir.path().join(RECORDINGS_DIR))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
