//! SQLite persistence for jobs and meetings.
//!
//! Every call opens its own connection on the blocking pool, so concurrent
//! jobs never share a connection and readers always see the latest commit.

pub mod init;
pub mod jobs;
pub mod meetings;

pub use init::migrate;
pub use jobs::JobRepository;
pub use meetings::{MeetingListing, MeetingRecord, MeetingRepository};

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::global::DB_FILE_NAME;
use crate::jobs::JobId;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the database file. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    path: Arc<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let db = Self {
            path: Arc::new(path),
        };

        let conn = db.connect()?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .context("Failed to enable WAL journal")?;
        migrate(&conn)?;

        Ok(db)
    }

    /// Open the database file inside a data directory.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(DB_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn =
            Connection::open(self.path.as_path()).context("Failed to open database connection")?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection on the blocking thread pool.
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.connect()?;
            f(&mut conn)
        })
        .await
        .context("Database task panicked")?
    }
}

/// Store the summary and mark the job complete in one transaction.
pub fn finalize_job(
    conn: &mut Connection,
    job_id: JobId,
    summary: &str,
    todo_list: &str,
) -> Result<()> {
    let tx = conn.transaction().context("Failed to begin transaction")?;

    if !MeetingRepository::set_summary(&tx, job_id, summary, todo_list)? {
        bail!("Meeting for job {} is missing", job_id);
    }
    if !JobRepository::complete(&tx, job_id)? {
        bail!("Job {} is not running", job_id);
    }

    tx.commit().context("Failed to commit job completion")?;
    Ok(())
}

/// Outcome of [`fail_job`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The job is now `FAILED`; `audio_ref` is the recording of the meeting
    /// that was dropped with it, if any.
    Recorded { audio_ref: Option<String> },
    /// The job had already reached a terminal state and was left alone.
    AlreadyFinished,
}

/// Mark the job failed and drop its meeting in one transaction.
pub fn fail_job(conn: &mut Connection, job_id: JobId, message: &str) -> Result<JobFailure> {
    let tx = conn.transaction().context("Failed to begin transaction")?;

    if !JobRepository::fail(&tx, job_id, message)? {
        warn!("Job {} already finished; failure not recorded", job_id);
        return Ok(JobFailure::AlreadyFinished);
    }
    let audio_ref = MeetingRepository::delete(&tx, job_id)?;

    tx.commit().context("Failed to commit job failure")?;
    Ok(JobFailure::Recorded { audio_ref })
}
