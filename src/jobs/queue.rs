//! Submission queue and dispatcher.
//!
//! [`JobQueue::submit`] records a `PENDING` job and hands the upload to the
//! [`JobWorker`] over a bounded channel. The worker takes a job off the
//! channel only once a semaphore permit is free, so at most `max_concurrent`
//! jobs run and waiting uploads stay `PENDING` in the channel. When the
//! channel is full, `submit` waits.

use std::any::Any;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{error, info};

use super::{Job, JobId, MeetingPipeline, PipelineTask};
use crate::db::{Database, JobRepository};

/// Recorded when a job was created but never reached the worker.
pub const LAUNCH_FAILURE_MESSAGE: &str = "Could not launch processing.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("could not create job: {0}")]
    Store(String),
    #[error("could not launch processing: job queue is closed")]
    Closed,
}

/// Front door for new jobs. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    sender: mpsc::Sender<PipelineTask>,
}

impl JobQueue {
    /// Build a queue and the receiving end for its [`JobWorker`].
    pub fn new(db: Database, capacity: usize) -> (Self, mpsc::Receiver<PipelineTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { db, sender }, receiver)
    }

    /// Create a `PENDING` job for `content` and enqueue it. Returns as soon
    /// as the job is queued; processing happens on the worker.
    pub async fn submit(&self, content: Vec<u8>, filename: String) -> Result<JobId, SubmitError> {
        let job = Job::new();
        let job_id = job.id;

        self.db
            .call(move |conn| JobRepository::insert(conn, &job))
            .await
            .map_err(|e| SubmitError::Store(format!("{:#}", e)))?;

        info!(
            "Queued job {} for {} ({} bytes)",
            job_id,
            filename,
            content.len()
        );

        let task = PipelineTask {
            job_id,
            content,
            filename,
        };

        if self.sender.send(task).await.is_err() {
            error!("Job worker is gone; failing job {}", job_id);
            if let Err(e) = self
                .db
                .call(move |conn| JobRepository::fail(conn, job_id, LAUNCH_FAILURE_MESSAGE))
                .await
            {
                error!("Could not record launch failure for {}: {:#}", job_id, e);
            }
            return Err(SubmitError::Closed);
        }

        Ok(job_id)
    }
}

/// Drains the queue, running each job on its own task.
pub struct JobWorker {
    receiver: mpsc::Receiver<PipelineTask>,
    pipeline: MeetingPipeline,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl JobWorker {
    pub fn new(
        receiver: mpsc::Receiver<PipelineTask>,
        pipeline: MeetingPipeline,
        max_concurrent: usize,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            receiver,
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Runs until every [`JobQueue`] handle is dropped. Jobs already
    /// dispatched keep running on their own tasks.
    pub async fn run(mut self) {
        info!(
            "Job worker started ({} concurrent jobs)",
            self.max_concurrent
        );

        loop {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let Some(task) = self.receiver.recv().await else {
                break;
            };
            tokio::spawn(run_job(self.pipeline.clone(), permit, task));
        }

        info!("Job worker stopped: queue closed");
    }
}

/// Holds `_permit` until the job, including any panic handling, is done.
async fn run_job(pipeline: MeetingPipeline, _permit: OwnedSemaphorePermit, task: PipelineTask) {
    let job_id = task.job_id;

    // Inner task so a panic in the pipeline surfaces as a JoinError here.
    let runner = pipeline.clone();
    let handle = tokio::spawn(async move { runner.run(task).await });

    if let Err(e) = handle.await {
        let reason = if e.is_panic() {
            panic_message(e.into_panic())
        } else {
            "task was cancelled".to_string()
        };
        pipeline.fail_after_panic(job_id, &reason).await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
