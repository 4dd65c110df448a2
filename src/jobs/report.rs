//! What a poller sees for a job.

use anyhow::Result;
use serde::Serialize;

use super::{JobId, JobStatus};
use crate::db::{Database, JobRepository, MeetingRepository};

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The job says `COMPLETE` but its meeting is absent or incomplete.
    #[error("job {0} is complete but its result is missing")]
    MissingResult(JobId),
    #[error("job store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Snapshot of a job, as served to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobReport {
    Progress {
        status: JobStatus,
        message: String,
    },
    Complete {
        status: JobStatus,
        title: String,
        transcript: String,
        summary: String,
        todo_list: String,
    },
}

impl JobReport {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Progress { status, .. } | Self::Complete { status, .. } => *status,
        }
    }
}

/// Read a job and, when complete, its meeting. `None` if the job is unknown.
pub async fn job_report(db: &Database, job_id: JobId) -> Result<Option<JobReport>, StatusError> {
    let snapshot = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let job = JobRepository::get(&tx, job_id)?;
            let meeting = match &job {
                Some(job) if job.status == JobStatus::Complete => {
                    MeetingRepository::get(&tx, job_id)?
                }
                _ => None,
            };
            tx.commit()?;
            Ok((job, meeting))
        })
        .await?;

    let (job, meeting) = match snapshot {
        (Some(job), meeting) => (job, meeting),
        (None, _) => return Ok(None),
    };

    if job.status != JobStatus::Complete {
        return Ok(Some(JobReport::Progress {
            status: job.status,
            message: job.message.unwrap_or_default(),
        }));
    }

    match meeting {
        Some(meeting) if meeting.is_populated() => Ok(Some(JobReport::Complete {
            status: JobStatus::Complete,
            title: meeting.title,
            transcript: meeting.transcript.unwrap_or_default(),
            summary: meeting.summary.unwrap_or_default(),
            todo_list: meeting.todo_list.unwrap_or_default(),
        })),
        _ => Err(StatusError::MissingResult(job_id)),
    }
}
