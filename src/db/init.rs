use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'PENDING'
                CHECK (status IN ('PENDING', 'RUNNING', 'COMPLETE', 'FAILED')),
            created_at TEXT NOT NULL,
            completed_at TEXT,
            message TEXT
        )",
        [],
    )
    .context("Failed to create jobs table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)",
        [],
    )
    .context("Failed to create jobs status index")?;

    // One meeting per job: the job id is the primary key.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            job_id TEXT PRIMARY KEY REFERENCES jobs(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            audio_ref TEXT NOT NULL,
            transcript TEXT,
            summary TEXT,
            todo_list TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_created_at ON meetings(created_at DESC)",
        [],
    )
    .context("Failed to create meetings created_at index")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in ["jobs", "meetings"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO jobs (id, status, created_at) VALUES ('x', 'DONE', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
