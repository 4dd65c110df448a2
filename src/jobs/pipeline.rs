//! The per-job pipeline.
//!
//! Drives one job from `PENDING` to a terminal state. Every stage returns
//! `Result<_, PipelineError>`; the first error sends the job down the single
//! [`MeetingPipeline::rollback`] path.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{JobId, JobStatus, PipelineError};
use crate::db::{self, Database, JobFailure, JobRepository, MeetingRepository};
use crate::media::{MediaExtractor, MediaKind};
use crate::storage::RecordingStore;
use crate::summary::Summarizer;
use crate::transcription::Transcriber;

/// Recorded on jobs that a previous process left unfinished.
pub const INTERRUPTED_MESSAGE: &str = "Interrupted by service restart";

/// Owned input for one job run.
#[derive(Debug)]
pub struct PipelineTask {
    pub job_id: JobId,
    pub content: Vec<u8>,
    pub filename: String,
}

#[derive(Clone)]
pub struct MeetingPipeline {
    db: Database,
    recordings: RecordingStore,
    extractor: MediaExtractor,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Summarizer,
}

impl MeetingPipeline {
    pub fn new(
        db: Database,
        recordings: RecordingStore,
        extractor: MediaExtractor,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            db,
            recordings,
            extractor,
            transcriber,
            summarizer,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run a job to completion. Failures are recorded on the job; the
    /// returned status is what was persisted.
    pub async fn run(&self, task: PipelineTask) -> JobStatus {
        let span = info_span!("meeting_job", job_id = %task.job_id, filename = %task.filename);

        async move {
            let job_id = task.job_id;

            match self.process(task).await {
                Ok(()) => {
                    info!("Job complete");
                    JobStatus::Complete
                }
                Err(err) => {
                    error!("Job failed: {}", err);
                    self.rollback(job_id, &err.diagnostic()).await;
                    JobStatus::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(&self, task: PipelineTask) -> Result<(), PipelineError> {
        let PipelineTask {
            job_id,
            content,
            filename,
        } = task;

        let label = format!("Preparing {}...", filename);
        let started = self
            .db
            .call(move |conn| JobRepository::mark_running(conn, job_id, &label))
            .await?;
        if !started {
            return Err(PipelineError::Store(format!(
                "job {} is not pending",
                job_id
            )));
        }

        if MediaKind::from_filename(&filename)? == MediaKind::Video {
            self.set_stage(job_id, format!("Extracting audio from {}...", filename))
                .await?;
        }
        let audio = self.extractor.extract(content, &filename).await?;

        let reference = self
            .recordings
            .save(&job_id.to_string(), &audio.name, &audio.bytes)
            .await?;
        let audio_name = audio.name;
        drop(audio.bytes);

        let title = filename.clone();
        let stored_ref = reference.clone();
        self.db
            .call(move |conn| MeetingRepository::insert(conn, job_id, &title, &stored_ref))
            .await?;
        info!("Stored recording as {}", reference);

        self.set_stage(job_id, "Transcribing audio...".to_string())
            .await?;
        let stored = self.recordings.read(&reference).await?;
        info!(
            "Transcribing {} bytes with {}",
            stored.len(),
            self.transcriber.name()
        );
        let transcript = self.transcriber.transcribe(&stored, &audio_name).await?;
        drop(stored);

        let text = transcript.clone();
        self.db
            .call(move |conn| MeetingRepository::set_transcript(conn, job_id, &text))
            .await?;

        self.set_stage(job_id, "Generating summary and to-do list...".to_string())
            .await?;
        let summary = self.summarizer.summarize(&transcript).await?;

        self.db
            .call(move |conn| {
                db::finalize_job(conn, job_id, &summary.summary, &summary.todo_list)
            })
            .await?;

        Ok(())
    }

    async fn set_stage(&self, job_id: JobId, label: String) -> Result<(), PipelineError> {
        info!("{}", label);
        let updated = self
            .db
            .call(move |conn| JobRepository::set_message(conn, job_id, &label))
            .await?;
        if !updated {
            return Err(PipelineError::Store(format!(
                "job {} is no longer running",
                job_id
            )));
        }
        Ok(())
    }

    /// Mark the job failed, drop its meeting and delete its stored audio.
    /// Cleanup problems are logged and never replace `message`.
    pub async fn rollback(&self, job_id: JobId, message: &str) {
        let diagnostic = message.to_string();
        let audio_ref = match self
            .db
            .call(move |conn| db::fail_job(conn, job_id, &diagnostic))
            .await
        {
            Ok(JobFailure::Recorded { audio_ref }) => audio_ref,
            Ok(JobFailure::AlreadyFinished) => return,
            Err(e) => {
                warn!("Could not record failure of job {}: {:#}", job_id, e);
                return;
            }
        };

        if let Some(reference) = audio_ref {
            if let Err(e) = self.recordings.delete(&reference).await {
                warn!("Could not delete recording {}: {}", reference, e);
            }
        }

        // Also catches audio saved before its meeting row was written.
        match self.recordings.delete_owned_by(&job_id.to_string()).await {
            Ok(0) => {}
            Ok(count) => debug!("Removed {} unreferenced recording(s) of job {}", count, job_id),
            Err(e) => warn!("Could not clean up recordings of job {}: {}", job_id, e),
        }
    }

    /// Record a job whose task panicked.
    pub async fn fail_after_panic(&self, job_id: JobId, panic: &str) {
        error!("Job {} panicked: {}", job_id, panic);
        let message = format!("Processing error: job task panicked: {}", panic);
        self.rollback(job_id, &message).await;
    }

    /// Fail every job a previous process left `PENDING` or `RUNNING`.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let unfinished = self
            .db
            .call(|conn| JobRepository::list_unfinished(conn))
            .await
            .context("Failed to list unfinished jobs")?;

        for job_id in &unfinished {
            warn!("Job {} was interrupted; marking it failed", job_id);
            self.rollback(*job_id, INTERRUPTED_MESSAGE).await;
        }

        Ok(unfinished.len())
    }
}
