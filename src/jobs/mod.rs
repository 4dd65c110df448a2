//! Background summarization jobs.
//!
//! A job is created in `PENDING` when a recording is submitted, handed to the
//! [`JobQueue`], and driven to `COMPLETE` or `FAILED` by the
//! [`MeetingPipeline`] on its own task:
//! extract audio → store recording → transcribe → summarize → finalize

pub mod error;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PipelineError;
pub use pipeline::{MeetingPipeline, PipelineTask, INTERRUPTED_MESSAGE};
pub use queue::{JobQueue, JobWorker, SubmitError, LAUNCH_FAILURE_MESSAGE};
pub use report::{job_report, JobReport, StatusError};
pub use status::JobStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A job record as persisted in the job store.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Current stage label while running, failure diagnosis once failed.
    pub message: Option<String>,
}

impl Job {
    pub fn new() -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            message: None,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
