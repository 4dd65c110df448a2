use std::error::Error as StdError;
use std::fmt::Write as _;

use crate::media::MediaError;
use crate::storage::StorageError;
use crate::summary::SummaryError;
use crate::transcription::TranscriptionError;

/// Why a job failed. Every variant is recorded on the job, never returned
/// to the submitter.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("audio extraction failed: {0}")]
    Extraction(#[source] MediaError),
    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),
    #[error("summarization failed: {0}")]
    Summarization(#[from] SummaryError),
    #[error("recording storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("job store error: {0}")]
    Store(String),
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            other => Self::Extraction(other),
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{:#}", err))
    }
}

impl PipelineError {
    /// The message recorded on a failed job: the error, then its cause chain.
    pub fn diagnostic(&self) -> String {
        let mut message = format!("Processing error: {}", self);

        let mut source = self.source();
        let mut depth = 0;
        while let Some(cause) = source {
            if depth == 0 {
                message.push_str("\n\nCaused by:");
            }
            let _ = write!(message, "\n    {}: {}", depth, cause);
            source = cause.source();
            depth += 1;
        }

        message
    }
}
