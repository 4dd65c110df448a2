//! Job record persistence.
//!
//! Status transitions are guarded in SQL: every update names the states it
//! may leave, so a terminal job is never rewritten. Each transition reports
//! whether a row actually changed.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::jobs::{Job, JobId, JobStatus};

impl ToSql for JobId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for JobId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        status: row.get(1)?,
        created_at: row.get(2)?,
        completed_at: row.get(3)?,
        message: row.get(4)?,
    })
}

/// Repository for job records.
pub struct JobRepository;

impl JobRepository {
    pub fn insert(conn: &Connection, job: &Job) -> Result<()> {
        conn.execute(
            "INSERT INTO jobs (id, status, created_at, completed_at, message) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job.id, job.status, job.created_at, job.completed_at, job.message],
        )
        .context("Failed to insert job")?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: JobId) -> Result<Option<Job>> {
        conn.query_row(
            "SELECT id, status, created_at, completed_at, message FROM jobs WHERE id = ?1",
            params![id],
            job_from_row,
        )
        .optional()
        .context("Failed to query job")
    }

    /// PENDING → RUNNING.
    pub fn mark_running(conn: &Connection, id: JobId, message: &str) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE jobs SET status = ?1, message = ?2 WHERE id = ?3 AND status = ?4",
                params![JobStatus::Running, message, id, JobStatus::Pending],
            )
            .context("Failed to mark job running")?;
        Ok(changed == 1)
    }

    /// Overwrite the stage label of a running job.
    pub fn set_message(conn: &Connection, id: JobId, message: &str) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE jobs SET message = ?1 WHERE id = ?2 AND status = ?3",
                params![message, id, JobStatus::Running],
            )
            .context("Failed to update job message")?;
        Ok(changed == 1)
    }

    /// RUNNING → COMPLETE, stamping the completion time and clearing the message.
    pub fn complete(conn: &Connection, id: JobId) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE jobs SET status = ?1, completed_at = ?2, message = NULL \
                 WHERE id = ?3 AND status = ?4",
                params![JobStatus::Complete, Utc::now(), id, JobStatus::Running],
            )
            .context("Failed to complete job")?;
        Ok(changed == 1)
    }

    /// PENDING/RUNNING → FAILED with a diagnostic message.
    pub fn fail(conn: &Connection, id: JobId, message: &str) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE jobs SET status = ?1, completed_at = ?2, message = ?3 \
                 WHERE id = ?4 AND status IN (?5, ?6)",
                params![
                    JobStatus::Failed,
                    Utc::now(),
                    message,
                    id,
                    JobStatus::Pending,
                    JobStatus::Running,
                ],
            )
            .context("Failed to mark job as failed")?;
        Ok(changed == 1)
    }

    /// Jobs that have not reached a terminal state.
    pub fn list_unfinished(conn: &Connection) -> Result<Vec<JobId>> {
        let mut stmt = conn
            .prepare("SELECT id FROM jobs WHERE status IN (?1, ?2) ORDER BY created_at")
            .context("Failed to prepare unfinished jobs query")?;

        let ids = stmt
            .query_map(params![JobStatus::Pending, JobStatus::Running], |row| {
                row.get(0)
            })
            .context("Failed to list unfinished jobs")?
            .collect::<std::result::Result<Vec<JobId>, _>>()
            .context("Failed to map unfinished jobs")?;

        Ok(ids)
    }
}
