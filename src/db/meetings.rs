//! Meeting record persistence.
//!
//! A meeting is the finished artifact of a job and shares its id. Raw SQL
//! with rusqlite, no ORM.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::jobs::{JobId, JobStatus};

/// A meeting record from the database.
#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub job_id: JobId,
    pub title: String,
    pub audio_ref: String,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub todo_list: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MeetingRecord {
    /// Whether every text field has been written.
    pub fn is_populated(&self) -> bool {
        self.transcript.is_some() && self.summary.is_some() && self.todo_list.is_some()
    }
}

/// Listing row for completed meetings.
#[derive(Debug, Clone)]
pub struct MeetingListing {
    pub job_id: JobId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Repository for meeting records.
pub struct MeetingRepository;

impl MeetingRepository {
    /// Insert the meeting for `job_id`. Fails if the job already has one.
    pub fn insert(conn: &Connection, job_id: JobId, title: &str, audio_ref: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO meetings (job_id, title, audio_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![job_id, title, audio_ref, Utc::now()],
        )
        .context("Failed to insert meeting")?;
        Ok(())
    }

    pub fn set_transcript(conn: &Connection, job_id: JobId, transcript: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET transcript = ?1 WHERE job_id = ?2",
            params![transcript, job_id],
        )
        .context("Failed to store transcript")?;
        Ok(())
    }

    pub fn set_summary(
        conn: &Connection,
        job_id: JobId,
        summary: &str,
        todo_list: &str,
    ) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE meetings SET summary = ?1, todo_list = ?2 WHERE job_id = ?3",
                params![summary, todo_list, job_id],
            )
            .context("Failed to store summary")?;
        Ok(changed == 1)
    }

    pub fn get(conn: &Connection, job_id: JobId) -> Result<Option<MeetingRecord>> {
        conn.query_row(
            "SELECT job_id, title, audio_ref, transcript, summary, todo_list, created_at \
             FROM meetings WHERE job_id = ?1",
            params![job_id],
            |row| {
                Ok(MeetingRecord {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    audio_ref: row.get(2)?,
                    transcript: row.get(3)?,
                    summary: row.get(4)?,
                    todo_list: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )
        .optional()
        .context("Failed to query meeting")
    }

    /// Delete the meeting for `job_id`, returning its stored audio reference.
    pub fn delete(conn: &Connection, job_id: JobId) -> Result<Option<String>> {
        let audio_ref: Option<String> = conn
            .query_row(
                "SELECT audio_ref FROM meetings WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up meeting audio")?;

        if audio_ref.is_some() {
            conn.execute("DELETE FROM meetings WHERE job_id = ?1", params![job_id])
                .context("Failed to delete meeting")?;
        }

        Ok(audio_ref)
    }

    /// Meetings whose job completed, newest first.
    pub fn list_completed(conn: &Connection, limit: usize) -> Result<Vec<MeetingListing>> {
        let mut stmt = conn
            .prepare(
                "SELECT m.job_id, m.title, m.created_at, j.completed_at \
                 FROM meetings m JOIN jobs j ON j.id = m.job_id \
                 WHERE j.status = ?1 \
                 ORDER BY m.created_at DESC LIMIT ?2",
            )
            .context("Failed to prepare meetings list query")?;

        let rows = stmt
            .query_map(params![JobStatus::Complete, limit as i64], |row| {
                Ok(MeetingListing {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    completed_at: row.get(3)?,
                })
            })
            .context("Failed to list meetings")?;

        let mut meetings = Vec::new();
        for row in rows {
            meetings.push(row?);
        }

        Ok(meetings)
    }
}
